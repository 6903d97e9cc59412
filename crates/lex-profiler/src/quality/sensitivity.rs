use crate::types::{DataType, SensitivityLevel};

/// Tags a column's dominant type with a data-governance level.
pub struct SensitivityClassifier;

impl SensitivityClassifier {
    pub fn classify(data_type: DataType) -> (SensitivityLevel, &'static str) {
        match data_type {
            DataType::Cpf | DataType::Cnpj => (
                SensitivityLevel::Confidential,
                "Personal/corporate identification",
            ),
            DataType::Email | DataType::MobilePhone => {
                (SensitivityLevel::Confidential, "Personal contact data")
            }
            DataType::FiscalKey44 => (SensitivityLevel::Confidential, "Fiscal secrecy"),
            DataType::LicensePlate | DataType::Rntrc | DataType::ContainerId => {
                (SensitivityLevel::Internal, "Logistics traceability")
            }
            DataType::EanProduct | DataType::Ncm => {
                (SensitivityLevel::Internal, "Commercial/product intelligence")
            }
            _ => (SensitivityLevel::Public, "General/unclassified data"),
        }
    }
}
