//! Online per-column statistics.

use crate::config::ProfilerConfig;
use crate::profiler::reservoir::Reservoir;
use crate::profiler::statistics::{NumericSummary, histogram};
use crate::profiler::type_inference::{HeaderHints, classify_with_hints};
use crate::quality::{QualityScorer, SensitivityClassifier};
use crate::types::{ColumnResult, DataType};
use crate::utils::{parse_decimal, ratio_or};
use std::collections::BTreeMap;

/// Accumulates one column's values in a single pass.
///
/// Created when the header is known, fed once per value, finalized once.
#[derive(Debug)]
pub struct ColumnAccumulator {
    name: String,
    hints: HeaderHints,
    total: usize,
    blank: usize,
    filled: usize,
    type_counts: BTreeMap<DataType, usize>,
    numeric: NumericSummary,
    sample: Reservoir<f64>,
    histogram_buckets: usize,
}

impl ColumnAccumulator {
    /// Accumulator for column number `index`, sized and seeded from `config`.
    pub fn new(name: impl Into<String>, index: usize, config: &ProfilerConfig) -> Self {
        let sample =
            Reservoir::with_optional_seed(config.numeric_sample_size, config.column_seed(index));
        Self::with_sample(name, sample, config.histogram_buckets)
    }

    pub fn with_sample(name: impl Into<String>, sample: Reservoir<f64>, histogram_buckets: usize) -> Self {
        let name = name.into();
        Self {
            hints: HeaderHints::new(&name),
            name,
            total: 0,
            blank: 0,
            filled: 0,
            type_counts: BTreeMap::new(),
            numeric: NumericSummary::default(),
            sample,
            histogram_buckets,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values attributed to this column so far.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Account for one raw value.
    pub fn add(&mut self, raw: &str) {
        self.total += 1;

        let value = raw.trim();
        if value.is_empty() {
            self.blank += 1;
            return;
        }
        self.filled += 1;

        let data_type = classify_with_hints(value, &self.hints);
        *self.type_counts.entry(data_type).or_insert(0) += 1;

        if data_type.is_numeric()
            && let Some(number) = parse_decimal(value)
        {
            self.numeric.update(number);
            self.sample.offer(number);
        }
    }

    /// Produce the column's final profile.
    pub fn finalize(self) -> ColumnResult {
        let main_type = dominant_type(&self.type_counts);
        let (sensitivity, sensitivity_reason) = SensitivityClassifier::classify(main_type);

        let (stats, histogram) = if main_type.is_numeric() {
            (
                self.numeric.to_stats(),
                histogram(self.sample.items(), self.histogram_buckets),
            )
        } else {
            (BTreeMap::new(), None)
        };

        let filled_ratio = ratio_or(self.filled, self.total, 0.0);
        let blank_ratio = ratio_or(self.blank, self.total, 0.0);
        let winner_count = self.type_counts.get(&main_type).copied().unwrap_or(0);
        let consistency_ratio = ratio_or(winner_count, self.filled, 1.0);
        let (sla, sla_reason) = QualityScorer::calculate_sla(blank_ratio, consistency_ratio, main_type);

        ColumnResult {
            name: self.name,
            main_type,
            sensitivity,
            sensitivity_reason: sensitivity_reason.to_string(),
            sla,
            sla_reason,
            blank_count: self.blank,
            count_filled: self.filled,
            filled_ratio,
            blank_ratio,
            consistency_ratio,
            type_counts: self.type_counts,
            stats,
            histogram,
        }
    }
}

/// Plurality vote over type counts, ties broken by [`DataType::priority`].
///
/// A column without votes (every value blank) is [`DataType::String`].
pub fn dominant_type(counts: &BTreeMap<DataType, usize>) -> DataType {
    counts
        .iter()
        .max_by_key(|&(data_type, &count)| (count, data_type.priority()))
        .map_or(DataType::String, |(&data_type, _)| data_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SensitivityLevel, SlaLevel, StatKey};
    use pretty_assertions::assert_eq;

    fn accumulate(name: &str, values: &[&str]) -> ColumnResult {
        let config = ProfilerConfig::builder().seed(1).build().unwrap();
        let mut acc = ColumnAccumulator::new(name, 0, &config);
        for v in values {
            acc.add(v);
        }
        acc.finalize()
    }

    #[test]
    fn test_string_column() {
        let result = accumulate("Nome", &["Joao", "Maria"]);
        assert_eq!(result.main_type, DataType::String);
        assert_eq!(result.count_filled, 2);
        assert_eq!(result.blank_count, 0);
        assert_eq!(result.consistency_ratio, 1.0);
        assert!(result.stats.is_empty());
        assert!(result.histogram.is_none());
        assert_eq!(result.sensitivity, SensitivityLevel::Public);
    }

    #[test]
    fn test_integer_column_stats() {
        let result = accumulate("Idade", &["10", "20", "30"]);
        assert_eq!(result.main_type, DataType::Integer);
        assert_eq!(
            result.stats,
            BTreeMap::from([
                (StatKey::Min, "10.00".to_string()),
                (StatKey::Max, "30.00".to_string()),
                (StatKey::Sum, "60.00".to_string()),
                (StatKey::Average, "20.00".to_string()),
            ])
        );
        let histogram = result.histogram.unwrap();
        assert_eq!(histogram.values().sum::<usize>(), 3);
    }

    #[test]
    fn test_cpf_column_with_pollution() {
        let result = accumulate("cpf_motorista", &["123.456.789-00", "111.222.333-44", "Não Informado"]);
        assert_eq!(result.main_type, DataType::Cpf);
        assert!((result.consistency_ratio - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(result.sla, SlaLevel::Critical);
        assert_eq!(result.sensitivity, SensitivityLevel::Confidential);
        assert_eq!(result.type_counts[&DataType::String], 1);
    }

    #[test]
    fn test_blanks_are_trimmed_and_counted() {
        let result = accumulate("obs", &["  ", "", "x", " y "]);
        assert_eq!(result.blank_count, 2);
        assert_eq!(result.count_filled, 2);
        assert_eq!(result.blank_ratio, 0.5);
        assert_eq!(result.filled_ratio, 0.5);
    }

    #[test]
    fn test_empty_column() {
        let result = accumulate("vazio", &[]);
        assert_eq!(result.main_type, DataType::String);
        assert_eq!(result.consistency_ratio, 1.0);
        assert_eq!(result.filled_ratio, 0.0);
        assert_eq!(result.sla, SlaLevel::Good);
    }

    #[test]
    fn test_all_blank_column_defaults_to_string() {
        let result = accumulate("vazio", &["", " "]);
        assert_eq!(result.main_type, DataType::String);
        assert_eq!(result.sensitivity, SensitivityLevel::Public);
        assert!(result.type_counts.is_empty());
        assert_eq!(result.sla, SlaLevel::Critical);
    }

    #[test]
    fn test_decimal_comma_float_column() {
        let result = accumulate("preco", &["1,5", "2,5", "3"]);
        assert_eq!(result.main_type, DataType::Float);
        assert_eq!(result.stats[&StatKey::Sum], "7.00");
        assert_eq!(result.stats[&StatKey::Min], "1.50");
    }

    #[test]
    fn test_type_counts_sum_to_filled() {
        let result = accumulate("mix", &["1", "a", "2.5", "", "true", "x@y.com"]);
        assert_eq!(result.type_counts.values().sum::<usize>(), result.count_filled);
        assert_eq!(result.blank_count + result.count_filled, 6);
        assert!((0.0..=1.0).contains(&result.consistency_ratio));
    }

    #[test]
    fn test_dominant_type_tie_break() {
        let counts = BTreeMap::from([(DataType::String, 2), (DataType::Integer, 2)]);
        assert_eq!(dominant_type(&counts), DataType::Integer);

        let counts = BTreeMap::from([(DataType::Cpf, 3), (DataType::Cnpj, 3), (DataType::String, 1)]);
        assert_eq!(dominant_type(&counts), DataType::Cnpj);

        let counts = BTreeMap::from([(DataType::Ncm, 1), (DataType::String, 1)]);
        assert_eq!(dominant_type(&counts), DataType::String);
    }

    #[test]
    fn test_dominant_type_plurality_wins() {
        let counts = BTreeMap::from([(DataType::String, 5), (DataType::FiscalKey44, 4)]);
        assert_eq!(dominant_type(&counts), DataType::String);
        assert_eq!(dominant_type(&BTreeMap::new()), DataType::String);
    }

    #[test]
    fn test_numeric_sample_is_capped() {
        let config = ProfilerConfig::builder()
            .numeric_sample_size(100)
            .seed(3)
            .build()
            .unwrap();
        let mut acc = ColumnAccumulator::new("n", 0, &config);
        for i in 0..5000 {
            acc.add(&i.to_string());
        }
        let result = acc.finalize();
        assert_eq!(result.histogram.unwrap().values().sum::<usize>(), 100);
        assert_eq!(result.stats[&StatKey::Max], "4999.00");
    }
}
