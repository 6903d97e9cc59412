//! Type inference for single values.
//!
//! Values are matched against an ordered cascade of patterns, first match
//! wins. Several Brazilian identifiers share a digit layout (an 8-digit NCM
//! code, RNTRC, CEP or compact date; an 11-digit CPF or phone; a 13/14-digit
//! EAN or CNPJ), so the column header is used to pick between them.

use crate::types::DataType;
use crate::utils::{header_mentions, is_boolean_string, is_digits, parse_decimal};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("Invalid regex: email")
});
// Mercosul (ABC1D23) and legacy (ABC1234 / ABC-1234) plates.
static LICENSE_PLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Z]{3}[0-9][A-Z][0-9]{2}|[A-Z]{3}-?[0-9]{4})$").expect("Invalid regex: plate")
});
static CONTAINER_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{4}[0-9]{7}$").expect("Invalid regex: container"));
static CEP_FORMATTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{5}-[0-9]{3}$").expect("Invalid regex: CEP"));
// Area code plus a 9-led subscriber number, e.g. (79) 99999-1234 or +55 79 999991234.
static MOBILE_PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\+55\s?)?(?:\([0-9]{2}\)|[0-9]{2})\s?9[0-9]{4}[\s\-]?[0-9]{4}$")
        .expect("Invalid regex: mobile")
});
static DATE_BR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{2})/([0-9]{2})/([0-9]{4})$").expect("Invalid regex: DD/MM/YYYY"));
static DATE_ISO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").expect("Invalid regex: YYYY-MM-DD"));
static CNPJ_FORMATTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{2}\.[0-9]{3}\.[0-9]{3}/[0-9]{4}-[0-9]{2}$").expect("Invalid regex: CNPJ")
});
static CPF_FORMATTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{3}\.[0-9]{3}\.[0-9]{3}-[0-9]{2}$").expect("Invalid regex: CPF"));

const NCM_HINTS: [&str; 4] = ["ncm", "fiscal", "classificacao", "sh"];
const RNTRC_HINTS: [&str; 3] = ["rntrc", "antt", "transportador"];
const CEP_HINTS: [&str; 3] = ["cep", "zip", "postal"];
const EAN_HINTS: [&str; 6] = ["ean", "gtin", "barras", "item", "produto", "sku"];
const CNPJ_HINTS: [&str; 4] = ["cnpj", "fornecedor", "empresa", "transportadora"];
const CPF_HINTS: [&str; 10] = [
    "cpf",
    "cliente",
    "consumidor",
    "pessoa",
    "colaborador",
    "funcionario",
    "usuario",
    "rg",
    "identidade",
    "documento",
];

/// Header keyword matches, computed once per column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderHints {
    ncm: bool,
    rntrc: bool,
    cep: bool,
    ean: bool,
    cnpj: bool,
    cpf: bool,
}

impl HeaderHints {
    pub fn new(header: &str) -> Self {
        let header = header.to_lowercase();
        Self {
            ncm: header_mentions(&header, &NCM_HINTS),
            rntrc: header_mentions(&header, &RNTRC_HINTS),
            cep: header_mentions(&header, &CEP_HINTS),
            ean: header_mentions(&header, &EAN_HINTS),
            cnpj: header_mentions(&header, &CNPJ_HINTS),
            cpf: header_mentions(&header, &CPF_HINTS),
        }
    }
}

/// Classify one value in the context of its column header.
///
/// The value is expected to be trimmed already.
pub fn classify(value: &str, header: &str) -> DataType {
    classify_with_hints(value, &HeaderHints::new(header))
}

/// Same as [`classify`] with the header analysis done up front.
pub fn classify_with_hints(value: &str, hints: &HeaderHints) -> DataType {
    if value.is_empty() {
        return DataType::Empty;
    }

    if is_digits(value, 8) {
        if hints.ncm {
            return DataType::Ncm;
        }
        if hints.rntrc {
            return DataType::Rntrc;
        }
        if hints.cep {
            return DataType::Cep;
        }
        if is_compact_date(value) {
            return DataType::DateCompact;
        }
    }

    if is_digits(value, 44) {
        return DataType::FiscalKey44;
    }
    if EMAIL.is_match(value) {
        return DataType::Email;
    }
    if LICENSE_PLATE.is_match(value) {
        return DataType::LicensePlate;
    }
    if CONTAINER_ID.is_match(value) {
        return DataType::ContainerId;
    }
    if CEP_FORMATTED.is_match(value) {
        return DataType::Cep;
    }
    if is_mobile_phone(value) {
        return DataType::MobilePhone;
    }

    if is_calendar_date(value) {
        return DataType::Date;
    }

    if is_digits(value, 13) || is_digits(value, 14) {
        if hints.ean {
            return DataType::EanProduct;
        }
        if hints.cnpj {
            return DataType::Cnpj;
        }
    }
    if CNPJ_FORMATTED.is_match(value) {
        return DataType::Cnpj;
    }

    if is_digits(value, 11) && hints.cpf {
        return DataType::Cpf;
    }
    if CPF_FORMATTED.is_match(value) {
        return DataType::Cpf;
    }

    if value.parse::<i64>().is_ok() {
        return DataType::Integer;
    }
    // Anything else that parses as a finite number, including integers
    // beyond the i64 range and exponent notation.
    if parse_decimal(value).is_some() {
        return DataType::Float;
    }
    if is_boolean_string(value) {
        return DataType::Boolean;
    }

    DataType::String
}

/// A mobile number must carry punctuation or the `+55` prefix, so a bare
/// 11-digit run is left for the CPF rules.
fn is_mobile_phone(value: &str) -> bool {
    !value.bytes().all(|b| b.is_ascii_digit()) && MOBILE_PHONE.is_match(value)
}

/// `YYYYMMDD` or `DDMMYYYY`, checked against the calendar.
fn is_compact_date(value: &str) -> bool {
    let part = |range: std::ops::Range<usize>| value[range].parse::<u32>().ok();
    let ymd = (part(0..4), part(4..6), part(6..8));
    let dmy = (part(4..8), part(2..4), part(0..2));
    [ymd, dmy].into_iter().any(|parts| match parts {
        (Some(y), Some(m), Some(d)) => valid_date(y, m, d),
        _ => false,
    })
}

/// `DD/MM/YYYY` or `YYYY-MM-DD`, checked against the calendar.
fn is_calendar_date(value: &str) -> bool {
    let (caps, [y, m, d]) = if let Some(caps) = DATE_BR.captures(value) {
        (caps, [3, 2, 1])
    } else if let Some(caps) = DATE_ISO.captures(value) {
        (caps, [1, 2, 3])
    } else {
        return false;
    };
    let field = |i: usize| caps[i].parse::<u32>().ok();
    matches!(
        (field(y), field(m), field(d)),
        (Some(y), Some(m), Some(d)) if valid_date(y, m, d)
    )
}

fn valid_date(year: u32, month: u32, day: u32) -> bool {
    i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, month, day))
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(classify("", "qualquer"), DataType::Empty);
    }

    #[test]
    fn test_eight_digits_use_header_context() {
        assert_eq!(classify("84713012", "codigo_ncm"), DataType::Ncm);
        assert_eq!(classify("84713012", "Classificacao Fiscal"), DataType::Ncm);
        assert_eq!(classify("12345678", "RNTRC"), DataType::Rntrc);
        assert_eq!(classify("49000000", "cep_destino"), DataType::Cep);
        assert_eq!(classify("20240131", "data"), DataType::DateCompact);
        assert_eq!(classify("31012024", "data"), DataType::DateCompact);
        assert_eq!(classify("84713012", "valor"), DataType::Integer);
    }

    #[test]
    fn test_fiscal_key() {
        let key = "3".repeat(44);
        assert_eq!(classify(&key, "chave"), DataType::FiscalKey44);
    }

    #[test]
    fn test_email() {
        assert_eq!(classify("ana.silva@empresa.com.br", "contato"), DataType::Email);
        assert_eq!(classify("ana@", "contato"), DataType::String);
    }

    #[test]
    fn test_license_plates() {
        assert_eq!(classify("ABC1D23", "placa"), DataType::LicensePlate);
        assert_eq!(classify("ABC1234", "placa"), DataType::LicensePlate);
        assert_eq!(classify("ABC-1234", "placa"), DataType::LicensePlate);
        assert_eq!(classify("AB-1234", "placa"), DataType::String);
    }

    #[test]
    fn test_container_and_cep() {
        assert_eq!(classify("MSCU1234567", "conteiner"), DataType::ContainerId);
        assert_eq!(classify("49000-000", "endereco"), DataType::Cep);
    }

    #[test]
    fn test_mobile_phone_requires_punctuation_or_prefix() {
        assert_eq!(classify("(79) 99999-1234", "telefone"), DataType::MobilePhone);
        assert_eq!(classify("79 99999-1234", "telefone"), DataType::MobilePhone);
        assert_eq!(classify("+5579999991234", "telefone"), DataType::MobilePhone);
        assert_eq!(classify("+55 79 999991234", "telefone"), DataType::MobilePhone);
        // Bare digits stay with the CPF/INTEGER rules.
        assert_eq!(classify("79999991234", "telefone"), DataType::Integer);
        assert_eq!(classify("79999991234", "cpf_cliente"), DataType::Cpf);
        // Landline: subscriber number does not start with 9.
        assert_eq!(classify("(79) 3211-1234", "telefone"), DataType::String);
    }

    #[test]
    fn test_dates() {
        assert_eq!(classify("31/12/2024", "data"), DataType::Date);
        assert_eq!(classify("2024-02-29", "data"), DataType::Date);
        assert_eq!(classify("2023-02-29", "data"), DataType::String);
        assert_eq!(classify("32/01/2024", "data"), DataType::String);
    }

    #[test]
    fn test_thirteen_fourteen_digits() {
        assert_eq!(classify("7891234567895", "codigo_barras"), DataType::EanProduct);
        assert_eq!(classify("12345678000199", "cnpj_fornecedor"), DataType::Cnpj);
        // Product hints win over company hints.
        assert_eq!(classify("12345678000199", "produto_empresa"), DataType::EanProduct);
        assert_eq!(classify("12345678000199", "valor"), DataType::Integer);
    }

    #[test]
    fn test_formatted_documents() {
        assert_eq!(classify("12.345.678/0001-99", "x"), DataType::Cnpj);
        assert_eq!(classify("123.456.789-00", "x"), DataType::Cpf);
        assert_eq!(classify("12345678900", "documento"), DataType::Cpf);
        assert_eq!(classify("12345678900", "quantidade"), DataType::Integer);
    }

    #[test]
    fn test_primitives() {
        assert_eq!(classify("42", "x"), DataType::Integer);
        assert_eq!(classify("-7", "x"), DataType::Integer);
        assert_eq!(classify("3.14", "x"), DataType::Float);
        assert_eq!(classify("3,14", "x"), DataType::Float);
        assert_eq!(classify("1,234,5", "x"), DataType::String);
        assert_eq!(classify("NaN", "x"), DataType::String);
        assert_eq!(classify("inf", "x"), DataType::String);
        assert_eq!(classify("1e5", "x"), DataType::Float);
        assert_eq!(classify("TRUE", "x"), DataType::Boolean);
        assert_eq!(classify("n", "x"), DataType::Boolean);
        assert_eq!(classify("Não Informado", "x"), DataType::String);
    }

    #[test]
    fn test_integer_beyond_i64_is_float() {
        assert_eq!(classify("12345678901234567890", "valor"), DataType::Float);
        assert_eq!(classify("-99999999999999999999", "valor"), DataType::Float);
        assert_eq!(classify("9223372036854775807", "valor"), DataType::Integer);
    }

    #[test]
    fn test_header_matching_is_case_insensitive() {
        assert_eq!(classify("12345678", "NCM_PRODUTO"), DataType::Ncm);
        assert_eq!(classify("12345678901", "CPF"), DataType::Cpf);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let samples = [
            ("123.456.789-00", "cpf_motorista"),
            ("84713012", "ncm"),
            ("(79) 99999-1234", "fone"),
            ("abc", "nome"),
            ("10,5", "preco"),
        ];
        for (value, header) in samples {
            assert_eq!(classify(value, header), classify(value, header));
            assert_eq!(
                classify(value, header),
                classify_with_hints(value, &HeaderHints::new(header))
            );
        }
    }
}
