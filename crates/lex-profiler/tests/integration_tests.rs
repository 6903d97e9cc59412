//! Integration tests for the profiler.
//!
//! These tests run whole uploads from `tests/fixtures` through the public API.

use lex_profiler::{
    CancellationToken, DataType, DetectedEncoding, InputFormat, Profiler, ProfilerConfig,
    ProfilerError, ProfilingStage, ProgressUpdate, RowEvent, SensitivityLevel, SlaLevel, StatKey,
    profile_async,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn open_fixture(filename: &str) -> (File, u64) {
    let file = File::open(fixtures_path().join(filename)).expect("Failed to open fixture");
    let size = file.metadata().expect("Failed to stat fixture").len();
    (file, size)
}

fn seeded_profiler() -> Profiler {
    Profiler::builder()
        .config(ProfilerConfig::builder().seed(2024).build().unwrap())
        .build()
        .unwrap()
}

// ============================================================================
// Streaming Path
// ============================================================================

#[tokio::test]
async fn test_stream_clean_csv() {
    let (file, size) = open_fixture("fretes.csv");
    let report = seeded_profiler()
        .profile_reader(file, "fretes.csv", size)
        .await
        .unwrap();

    assert_eq!(report.name_file, "fretes");
    assert_eq!(report.total_max_rows, 6);
    assert_eq!(report.total_columns, 7);
    assert_eq!(report.dirty_lines_count, 0);
    assert_eq!(report.sample_rows.len(), 6);

    let expected = [
        ("cpf_motorista", DataType::Cpf),
        ("placa", DataType::LicensePlate),
        ("cep_destino", DataType::Cep),
        ("valor_frete", DataType::Float),
        ("data_coleta", DataType::Date),
        ("email_contato", DataType::Email),
        ("chave_nfe", DataType::FiscalKey44),
    ];
    for (name, data_type) in expected {
        let column = report.column(name).unwrap();
        assert_eq!(column.main_type, data_type, "column {name}");
        assert_eq!(column.sla, SlaLevel::Good, "column {name}");
        assert_eq!(column.count_filled, 6);
        assert_eq!(column.consistency_ratio, 1.0);
    }

    let cpf = report.column("cpf_motorista").unwrap();
    assert_eq!(cpf.sensitivity, SensitivityLevel::Confidential);

    let valor = report.column("valor_frete").unwrap();
    assert_eq!(valor.stats[&StatKey::Min], "450.10");
    assert_eq!(valor.stats[&StatKey::Max], "3100.90");
    assert_eq!(valor.histogram.as_ref().unwrap().values().sum::<usize>(), 6);
}

#[tokio::test]
async fn test_stream_dirty_csv() {
    let (file, size) = open_fixture("fretes_sujos.csv");
    let report = seeded_profiler()
        .profile_reader(file, "fretes_sujos.csv", size)
        .await
        .unwrap();

    assert_eq!(report.total_max_rows, 3);
    assert_eq!(report.dirty_lines_count, 2);
    let lines: Vec<u64> = report.dirty_lines.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![3, 5]);

    let cpf = report.column("cpf_motorista").unwrap();
    assert_eq!(cpf.main_type, DataType::Cpf);
    assert_eq!(cpf.type_counts[&DataType::String], 1);
    assert_eq!(cpf.sla, SlaLevel::Critical);
    assert!(cpf.sla_reason.starts_with("High pollution"));
}

#[tokio::test]
async fn test_stream_jsonl() {
    let (file, size) = open_fixture("notas.jsonl");
    let report = seeded_profiler()
        .profile_reader(file, "notas.jsonl", size)
        .await
        .unwrap();

    let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["cancelada", "cnpj_emitente", "itens", "ncm", "valor_total"]
    );
    assert_eq!(report.total_max_rows, 4);
    assert_eq!(report.dirty_lines_count, 1);
    assert_eq!(report.dirty_lines[0].line, 4);
    assert!(report.dirty_lines[0].reason.starts_with("malformed JSON"));

    assert_eq!(report.column("cancelada").unwrap().main_type, DataType::Boolean);
    assert_eq!(report.column("cnpj_emitente").unwrap().main_type, DataType::Cnpj);
    assert_eq!(report.column("ncm").unwrap().main_type, DataType::Ncm);
    let valor = report.column("valor_total").unwrap();
    assert_eq!(valor.main_type, DataType::Float);
    // `10.0` renders as "10" and votes INTEGER.
    assert_eq!(valor.type_counts[&DataType::Integer], 1);
    assert_eq!(valor.type_counts[&DataType::Float], 3);

    let itens = report.column("itens").unwrap();
    assert_eq!(itens.main_type, DataType::String);
    assert_eq!(itens.blank_count, 1);
    assert_eq!(itens.count_filled, 3);
}

#[tokio::test]
async fn test_stream_windows_1252() {
    let (file, _) = open_fixture("municipios_cp1252.csv");
    let profiler = seeded_profiler();
    let mut stream = profiler.open_stream(file).unwrap();

    assert_eq!(stream.description.encoding, DetectedEncoding::Windows1252);
    assert_eq!(stream.description.format, InputFormat::Csv);
    assert_eq!(stream.headers(), ["Município", "População", "Região"]);

    let headers = stream.headers().to_vec();
    let token = CancellationToken::new();
    let report = profile_async(
        &headers,
        &mut stream.events,
        &stream.pool,
        "municipios_cp1252.csv",
        profiler.config(),
        &token,
    )
    .await;

    assert_eq!(report.total_max_rows, 3);
    assert_eq!(report.column("População").unwrap().main_type, DataType::Integer);
    assert!(report.sample_rows.iter().any(|row| row[0] == "São Cristóvão"));
}

#[tokio::test]
async fn test_stream_events_in_file_order() {
    let (file, _) = open_fixture("fretes_sujos.csv");
    let mut stream = seeded_profiler().open_stream(file).unwrap();

    let mut lines = Vec::new();
    while let Some(event) = stream.events.recv().await {
        lines.push((event.line_number(), matches!(event, RowEvent::Dirty { .. })));
        if let RowEvent::Row { values, .. } = event {
            stream.pool.put(values);
        }
    }
    assert_eq!(
        lines,
        vec![(2, false), (3, true), (4, false), (5, true), (6, false)]
    );
}

#[tokio::test]
async fn test_stream_progress_is_monotonic() {
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);
    let (file, size) = open_fixture("fretes.csv");

    Profiler::builder()
        .on_progress(move |update| sink.lock().push(update))
        .build()
        .unwrap()
        .profile_reader(file, "fretes.csv", size)
        .await
        .unwrap();

    let updates = updates.lock();
    assert!(
        updates
            .windows(2)
            .all(|pair| pair[0].percentage <= pair[1].percentage)
    );
    let last = updates.last().unwrap();
    assert_eq!(last.stage, ProfilingStage::Complete);
    assert_eq!(last.percentage, 100.0);
    assert_eq!(last.bytes_read, size);
    assert!(
        updates
            .iter()
            .filter(|u| u.stage == ProfilingStage::Reading)
            .all(|u| u.percentage <= 80.0)
    );
}

#[tokio::test]
async fn test_stream_empty_file() {
    let (file, size) = open_fixture("vazio.csv");
    let err = seeded_profiler()
        .profile_reader(file, "vazio.csv", size)
        .await
        .unwrap_err();
    assert!(matches!(err, ProfilerError::EmptyInput));
    assert_eq!(err.http_status(), 500);
}

#[tokio::test]
async fn test_stream_cancelled_before_start() {
    let token = CancellationToken::new();
    token.cancel();
    let (file, size) = open_fixture("fretes.csv");

    let err = Profiler::builder()
        .cancellation_token(token)
        .build()
        .unwrap()
        .profile_reader(file, "fretes.csv", size)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.error_code(), "CANCELLED");
}

// ============================================================================
// Synchronous Path
// ============================================================================

#[test]
fn test_sync_matches_stream_columns() {
    let (file, _) = open_fixture("fretes.csv");
    let sync_report = seeded_profiler()
        .profile_reader_sync(file, "fretes.csv")
        .unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (file, size) = open_fixture("fretes.csv");
    let stream_report = runtime
        .block_on(seeded_profiler().profile_reader(file, "fretes.csv", size))
        .unwrap();

    assert_eq!(sync_report.columns, stream_report.columns);
    assert_eq!(sync_report.total_max_rows, stream_report.total_max_rows);
    assert!(sync_report.sample_rows.is_empty());
}

#[test]
fn test_sync_skips_and_reports_dirty_rows() {
    let (file, _) = open_fixture("fretes_sujos.csv");
    let report = seeded_profiler()
        .profile_reader_sync(file, "fretes_sujos.csv")
        .unwrap();

    assert_eq!(report.total_max_rows, 3);
    assert_eq!(report.dirty_lines_count, 2);
    let lines: Vec<u64> = report.dirty_lines.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![3, 5]);
}

// ============================================================================
// Report Serialization
// ============================================================================

#[tokio::test]
async fn test_report_json_shape() {
    let (file, size) = open_fixture("fretes.csv");
    let report = seeded_profiler()
        .profile_reader(file, "fretes.csv", size)
        .await
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    for key in [
        "name_file",
        "total_max_rows",
        "total_columns",
        "dirty_lines_count",
        "columns",
        "sample_rows",
        "dirty_lines",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }

    let columns = json["columns"].as_array().unwrap();
    let placa = columns.iter().find(|c| c["name"] == "placa").unwrap();
    assert_eq!(placa["main_type"], "LICENSE_PLATE");
    assert_eq!(placa["sensitivity_level"], "INTERNAL");
    assert_eq!(placa["sla"], "GOOD");
    assert!(placa.get("stats").is_none());
    assert!(placa.get("histogram").is_none());

    let valor = columns.iter().find(|c| c["name"] == "valor_frete").unwrap();
    assert_eq!(valor["stats"]["sum"], "9532.25");
    assert_eq!(valor["type_counts"]["FLOAT"], 6);
}
