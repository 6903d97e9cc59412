use crate::types::{DataType, SlaLevel};

/// How strict the quality thresholds are for a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn of(data_type: DataType) -> Self {
        match data_type {
            DataType::Cpf
            | DataType::Cnpj
            | DataType::FiscalKey44
            | DataType::LicensePlate
            | DataType::Rntrc
            | DataType::ContainerId => Severity::High,
            DataType::Integer
            | DataType::Float
            | DataType::Date
            | DataType::DateCompact
            | DataType::Email
            | DataType::EanProduct
            | DataType::MobilePhone
            | DataType::Cep => Severity::Medium,
            _ => Severity::Low,
        }
    }

    /// `(good, warning)` upper bounds for the blank ratio.
    fn completeness_limits(self) -> (f64, f64) {
        match self {
            Severity::High => (0.00, 0.01),
            Severity::Medium => (0.01, 0.10),
            Severity::Low => (0.20, 0.50),
        }
    }

    /// `(critical, warning)` lower bounds for the consistency ratio.
    /// `None` means consistency is not graded.
    fn consistency_limits(self) -> Option<(f64, f64)> {
        match self {
            Severity::High => Some((0.99, 0.999)),
            Severity::Medium => Some((0.90, 0.98)),
            Severity::Low => None,
        }
    }
}

/// Grades a column from its blank and consistency ratios.
pub struct QualityScorer;

impl QualityScorer {
    /// Grade a column and explain the grade.
    ///
    /// Missing data is checked before pollution, and critical findings
    /// before warnings.
    pub fn calculate_sla(
        blank_ratio: f64,
        consistency_ratio: f64,
        data_type: DataType,
    ) -> (SlaLevel, String) {
        let severity = Severity::of(data_type);
        let completeness = Self::evaluate_completeness(blank_ratio, severity);
        let consistency = Self::evaluate_consistency(consistency_ratio, severity);
        let blank_pct = blank_ratio * 100.0;
        let invalid_pct = (1.0 - consistency_ratio) * 100.0;

        if completeness == SlaLevel::Critical {
            return (
                SlaLevel::Critical,
                format!("Critical volume of missing data ({blank_pct:.1}% blank)"),
            );
        }
        if consistency == SlaLevel::Critical {
            return (
                SlaLevel::Critical,
                format!("High pollution: {invalid_pct:.1}% of values are not {data_type}"),
            );
        }
        if completeness == SlaLevel::Warning {
            return (
                SlaLevel::Warning,
                format!("Warning: high volume of blanks ({blank_pct:.1}%)"),
            );
        }
        if consistency == SlaLevel::Warning {
            return (
                SlaLevel::Warning,
                format!("Warning: signs of dirty data ({invalid_pct:.1}% invalid)"),
            );
        }
        (SlaLevel::Good, "Healthy data".to_string())
    }

    pub fn evaluate_completeness(blank_ratio: f64, severity: Severity) -> SlaLevel {
        let (good, warning) = severity.completeness_limits();
        if blank_ratio <= good {
            SlaLevel::Good
        } else if blank_ratio <= warning {
            SlaLevel::Warning
        } else {
            SlaLevel::Critical
        }
    }

    /// A ratio of exactly zero (nothing filled matched) is not graded.
    pub fn evaluate_consistency(consistency_ratio: f64, severity: Severity) -> SlaLevel {
        if consistency_ratio == 0.0 {
            return SlaLevel::Good;
        }
        let Some((critical, warning)) = severity.consistency_limits() else {
            return SlaLevel::Good;
        };
        if consistency_ratio < critical {
            SlaLevel::Critical
        } else if consistency_ratio < warning {
            SlaLevel::Warning
        } else {
            SlaLevel::Good
        }
    }
}
