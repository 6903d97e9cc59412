use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Data Types
// ============================================================================

/// Semantic type assigned to a single value, and by plurality vote to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Empty,
    Integer,
    Float,
    Boolean,
    String,
    /// 44-digit electronic invoice access key.
    #[serde(rename = "FISCAL_KEY_44")]
    FiscalKey44,
    Cnpj,
    Cpf,
    LicensePlate,
    Ncm,
    Rntrc,
    EanProduct,
    ContainerId,
    Cep,
    MobilePhone,
    Email,
    Date,
    DateCompact,
}

impl DataType {
    /// Every variant, in declaration order.
    pub const ALL: [DataType; 18] = [
        DataType::Empty,
        DataType::Integer,
        DataType::Float,
        DataType::Boolean,
        DataType::String,
        DataType::FiscalKey44,
        DataType::Cnpj,
        DataType::Cpf,
        DataType::LicensePlate,
        DataType::Ncm,
        DataType::Rntrc,
        DataType::EanProduct,
        DataType::ContainerId,
        DataType::Cep,
        DataType::MobilePhone,
        DataType::Email,
        DataType::Date,
        DataType::DateCompact,
    ];

    /// Rank used to break ties in the dominant-type vote. Higher wins.
    ///
    /// Every variant has a distinct rank, so the vote is a total order and
    /// never depends on map iteration.
    pub fn priority(self) -> u8 {
        match self {
            DataType::Empty => 0,
            DataType::Ncm => 1,
            DataType::Rntrc => 2,
            DataType::EanProduct => 3,
            DataType::ContainerId => 4,
            DataType::MobilePhone => 5,
            DataType::String => 6,
            DataType::Boolean => 7,
            DataType::Integer => 8,
            DataType::Float => 9,
            DataType::Date => 10,
            DataType::DateCompact => 11,
            DataType::Email => 12,
            DataType::LicensePlate => 13,
            DataType::Cep => 14,
            DataType::Cpf => 15,
            DataType::Cnpj => 16,
            DataType::FiscalKey44 => 17,
        }
    }

    /// Whether values of this type feed min/max/sum and the histogram.
    #[inline]
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    /// Upper-case name as it appears in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Empty => "EMPTY",
            DataType::Integer => "INTEGER",
            DataType::Float => "FLOAT",
            DataType::Boolean => "BOOLEAN",
            DataType::String => "STRING",
            DataType::FiscalKey44 => "FISCAL_KEY_44",
            DataType::Cnpj => "CNPJ",
            DataType::Cpf => "CPF",
            DataType::LicensePlate => "LICENSE_PLATE",
            DataType::Ncm => "NCM",
            DataType::Rntrc => "RNTRC",
            DataType::EanProduct => "EAN_PRODUCT",
            DataType::ContainerId => "CONTAINER_ID",
            DataType::Cep => "CEP",
            DataType::MobilePhone => "MOBILE_PHONE",
            DataType::Email => "EMAIL",
            DataType::Date => "DATE",
            DataType::DateCompact => "DATE_COMPACT",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data-governance tag for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensitivityLevel {
    Public,
    Internal,
    Confidential,
}

impl fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SensitivityLevel::Public => "PUBLIC",
            SensitivityLevel::Internal => "INTERNAL",
            SensitivityLevel::Confidential => "CONFIDENTIAL",
        })
    }
}

/// Derived quality grade for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SlaLevel {
    Good,
    Warning,
    Critical,
}

impl fmt::Display for SlaLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlaLevel::Good => "GOOD",
            SlaLevel::Warning => "WARNING",
            SlaLevel::Critical => "CRITICAL",
        })
    }
}

/// Keys of the numeric summary attached to INTEGER/FLOAT columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKey {
    Min,
    Max,
    Sum,
    Average,
}

// ============================================================================
// Ingest Types
// ============================================================================

/// A fully materialized column, used by the synchronous path only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawColumn {
    pub name: String,
    pub values: Vec<String>,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// One parsed line of input, in file order.
///
/// `line_number` is 1-based and counts the header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowEvent {
    /// A well-formed record. The buffer comes from the run's `RowPool`.
    Row { line_number: u64, values: Vec<String> },
    /// A record that could not be parsed. Processing continues after it.
    Dirty { line_number: u64, reason: String },
}

impl RowEvent {
    pub fn line_number(&self) -> u64 {
        match self {
            RowEvent::Row { line_number, .. } | RowEvent::Dirty { line_number, .. } => {
                *line_number
            }
        }
    }
}

/// A recorded dirty line as it appears in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyLine {
    pub line: u64,
    pub reason: String,
}

// ============================================================================
// Report Types
// ============================================================================

/// Final per-column profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnResult {
    pub name: String,
    pub main_type: DataType,
    #[serde(rename = "sensitivity_level")]
    pub sensitivity: SensitivityLevel,
    pub sensitivity_reason: String,
    pub sla: SlaLevel,
    pub sla_reason: String,
    pub blank_count: usize,
    pub count_filled: usize,
    pub filled_ratio: f64,
    pub blank_ratio: f64,
    /// Share of filled values that match `main_type`, in `[0, 1]`.
    pub consistency_ratio: f64,
    pub type_counts: BTreeMap<DataType, usize>,
    /// Two-decimal summary, present only for numeric columns.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stats: BTreeMap<StatKey, String>,
    /// Bucket label to count, computed over the numeric reservoir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<BTreeMap<String, usize>>,
}

/// Aggregate profile of one input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilerResult {
    /// File name with its extension stripped.
    pub name_file: String,
    pub total_max_rows: usize,
    pub total_columns: usize,
    pub dirty_lines_count: usize,
    pub columns: Vec<ColumnResult>,
    /// Uniform preview of well-formed rows. Empty for the synchronous path.
    pub sample_rows: Vec<Vec<String>>,
    /// First dirty lines encountered, capped by `max_dirty_lines`.
    pub dirty_lines: Vec<DirtyLine>,
}

impl ProfilerResult {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnResult> {
        self.columns.iter().find(|c| c.name == name)
    }
}
