//! Integration tests for the audit run: batching, failure isolation,
//! ordering, cancellation and report consistency

mod helpers;

use a11y_audit::dataset::load_dataset;
use a11y_audit::models::report::OperationStatus;
use a11y_audit::models::{OperationId, OperationResult, RecordFinding, TableKind};
use a11y_audit::services::{AnalysisClient, JsonFileSink, ReportCatalog, ReportSink};
use a11y_audit::{AuditReport, OperationPlan, RunContext};
use helpers::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

async fn run(
    request: &str,
    dataset: a11y_audit::dataset::DatasetView,
    client: Option<Arc<MockClient>>,
    settings: a11y_audit::config::AuditSettings,
) -> AuditReport {
    let dir = TempDir::new().unwrap();
    let client = client.map(|c| c as Arc<dyn AnalysisClient>);
    let services = services_with(settings, dataset, client, dir.path(), CancellationToken::new());
    RunContext::new(OperationPlan::parse(request), services).execute().await
}

fn suggestion_rows(report: &AuditReport) -> Vec<usize> {
    match report.result(OperationId::MissingValues) {
        Some(OperationResult::MissingValues(r)) => r.suggestions.iter().map(|f| f.row_index()).collect(),
        other => panic!("unexpected result {:?}", other),
    }
}

// ============================================================================
// Batch failure isolation
// ============================================================================

#[tokio::test]
async fn test_failed_batch_counts_without_failing_operation() {
    // 32 records in batches of 15: [15, 15, 2]; batch 1 never succeeds
    let client = Arc::new(MockClient::new().failing_batch(1));
    let report = run(
        "1",
        view(Some(active_table(32)), None),
        Some(Arc::clone(&client)),
        test_settings(),
    )
    .await;

    let entry = report.entry(OperationId::MissingValues).unwrap();
    assert_eq!(entry.status, OperationStatus::Partial);
    assert_eq!(entry.batches_processed, 2);
    assert_eq!(entry.batches_failed, 1);

    let batches = report.result(OperationId::MissingValues).unwrap().batches();
    assert_eq!(batches.batches_scheduled, 3);
    assert!(batches.is_consistent());
    assert_eq!(batches.failures[0].batch_index, 1);
    assert_eq!(batches.failures[0].first_row, 15);

    let expected: Vec<usize> = (0..15).chain(30..32).collect();
    assert_eq!(suggestion_rows(&report), expected);

    // Default retry budget is three attempts
    assert_eq!(client.calls_for_batch(1), 3);

    assert_eq!(report.summary.operations_completed, 1);
    assert_eq!(report.summary.operations_failed, 0);
    assert_eq!(report.summary.operations_partial, 1);
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let client = Arc::new(MockClient::new().rejecting_batch(0));
    let report = run(
        "3",
        view(Some(active_table(20)), None),
        Some(Arc::clone(&client)),
        test_settings(),
    )
    .await;

    let entry = report.entry(OperationId::IncorrectInfo).unwrap();
    assert_eq!(entry.batches_processed, 1);
    assert_eq!(entry.batches_failed, 1);
    assert_eq!(client.calls_for_batch(0), 1);
}

#[tokio::test]
async fn test_transient_failure_recovers_within_budget() {
    let client = Arc::new(MockClient::new().flaky_batch(0, 2));
    let report = run(
        "2",
        view(Some(active_table(10)), None),
        Some(Arc::clone(&client)),
        test_settings(),
    )
    .await;

    let entry = report.entry(OperationId::Contradictions).unwrap();
    assert_eq!(entry.status, OperationStatus::Success);
    assert_eq!(entry.batches_processed, 1);
    assert_eq!(client.calls_for_batch(0), 3);
}

#[tokio::test]
async fn test_call_timeout_is_retried_then_fails_batch() {
    let mut settings = test_settings();
    settings.call_timeout_ms = 20;
    settings.retry.max_attempts = 2;
    let client = Arc::new(MockClient::new().delayed_batch(0, Duration::from_millis(500)));

    let report = run(
        "3",
        view(Some(active_table(5)), None),
        Some(Arc::clone(&client)),
        settings,
    )
    .await;

    let entry = report.entry(OperationId::IncorrectInfo).unwrap();
    assert_eq!(entry.status, OperationStatus::Partial);
    assert_eq!(entry.batches_failed, 1);
    assert_eq!(client.calls_for_batch(0), 2);
}

#[tokio::test]
async fn test_quota_wait_does_not_count_against_call_timeout() {
    let mut settings = test_settings();
    settings.call_timeout_ms = 50;
    settings.retry.max_attempts = 1;
    let client = Arc::new(MockClient::new().throttled(Duration::from_millis(200)));

    let report = run(
        "3",
        view(Some(active_table(5)), None),
        Some(Arc::clone(&client)),
        settings,
    )
    .await;

    let entry = report.entry(OperationId::IncorrectInfo).unwrap();
    assert_eq!(entry.status, OperationStatus::Success);
    assert_eq!(entry.batches_failed, 0);
    assert_eq!(client.calls_for_batch(0), 1);
}

// ============================================================================
// Record-level degradation
// ============================================================================

#[tokio::test]
async fn test_malformed_and_missing_replies_degrade_single_records() {
    let client = Arc::new(MockClient::new().malformed_row(2).silent_row(4).incorrect_row(1));
    let report = run(
        "3",
        view(Some(active_table(6)), None),
        Some(client),
        test_settings(),
    )
    .await;

    let Some(OperationResult::IncorrectInfo(result)) = report.result(OperationId::IncorrectInfo) else {
        panic!("missing incorrect info result");
    };
    assert_eq!(result.batches.batches_failed, 0);
    assert_eq!(result.findings.len(), 6);

    let unresolved: Vec<usize> = result
        .findings
        .iter()
        .filter(|f| !f.is_resolved())
        .map(|f| f.row_index())
        .collect();
    assert_eq!(unresolved, vec![2, 4]);

    assert_eq!(result.summary.correct, 3);
    assert_eq!(result.summary.incorrect, 1);
    assert_eq!(result.summary.unresolved, 2);
    assert_eq!(result.summary.correct_percentage, 75.0);
}

#[tokio::test]
async fn test_nameless_record_unresolved_without_query() {
    let mut table = active_table(3);
    table.records[1] = a11y_audit::models::ToolRecord::new(TableKind::Active, 1).with_description("Mystery");
    let client = Arc::new(MockClient::new());

    let report = run("2", view(Some(table), None), Some(Arc::clone(&client)), test_settings()).await;

    assert_eq!(client.queried_rows(), vec![0, 2]);
    let Some(OperationResult::Contradictions(result)) = report.result(OperationId::Contradictions) else {
        panic!("missing contradictions result");
    };
    match &result.findings[1] {
        RecordFinding::Unresolved { row_index, reason, .. } => {
            assert_eq!(*row_index, 1);
            assert!(reason.contains("no product name"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_complete_batch_makes_no_call() {
    let mut records: Vec<_> = (0..15).map(|i| complete_record(TableKind::Active, i)).collect();
    records.extend((15..20).map(|i| incomplete_record(TableKind::Active, i)));
    let table = helpers::datasets::table(TableKind::Active, records);
    let client = Arc::new(MockClient::new());

    let report = run("1", view(Some(table), None), Some(Arc::clone(&client)), test_settings()).await;

    assert_eq!(client.calls_for_batch(0), 0);
    assert_eq!(client.calls_for_batch(1), 1);
    let entry = report.entry(OperationId::MissingValues).unwrap();
    assert_eq!(entry.batches_processed, 2);
    assert_eq!(suggestion_rows(&report), (15..20).collect::<Vec<_>>());

    let Some(OperationResult::MissingValues(result)) = report.result(OperationId::MissingValues) else {
        panic!("missing result");
    };
    assert_eq!(result.summary.total_records, 20);
    assert_eq!(result.summary.complete_records, 15);
    assert_eq!(result.summary.incomplete_records, 5);
    assert!(result.removed_blank_cells.is_none());
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn test_findings_follow_record_order_not_completion_order() {
    let mut settings = test_settings();
    settings.batch_size = 4;
    settings.max_concurrent_batches = 3;
    let client = Arc::new(
        MockClient::new()
            .delayed_batch(0, Duration::from_millis(120))
            .delayed_batch(1, Duration::from_millis(60)),
    );

    let report = run("1", view(Some(active_table(12)), None), Some(client), settings).await;

    assert_eq!(suggestion_rows(&report), (0..12).collect::<Vec<_>>());
}

// ============================================================================
// Request handling and operation isolation
// ============================================================================

#[tokio::test]
async fn test_unknown_ids_rejected_without_affecting_valid_ones() {
    let report = run(
        "1,3,99",
        view(Some(active_table(5)), None),
        Some(Arc::new(MockClient::new())),
        test_settings(),
    )
    .await;

    assert_eq!(report.summary.total_operations, 2);
    assert_eq!(report.summary.operations_completed, 2);
    assert_eq!(report.audit_operations, vec![OperationId::MissingValues, OperationId::IncorrectInfo]);
    assert_eq!(report.rejected_operations.len(), 1);
    assert_eq!(report.rejected_operations[0].token, "99");
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_missing_table_fails_only_that_operation() {
    let report = run("1,8,10", view(None, None), None, test_settings()).await;

    let missing = report.entry(OperationId::MissingValues).unwrap();
    assert_eq!(missing.status, OperationStatus::Failed);
    assert!(missing.error.as_deref().unwrap().contains("Dataset structure"));

    assert!(report.entry(OperationId::DataSummary).unwrap().status.is_completed());
    assert!(report.entry(OperationId::ColumnMapping).unwrap().status.is_completed());
    assert_eq!(report.summary.operations_completed, 2);
    assert_eq!(report.summary.operations_failed, 1);
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_batched_operation_without_client_fails_alone() {
    let report = run("2,4", view(Some(active_table(5)), None), None, test_settings()).await;

    assert_eq!(report.entry(OperationId::Contradictions).unwrap().status, OperationStatus::Failed);
    assert_eq!(report.entry(OperationId::Duplicates).unwrap().status, OperationStatus::Success);
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_unavailable_client_reason_reaches_report() {
    let dir = TempDir::new().unwrap();
    let services = services_with(
        test_settings(),
        view(Some(active_table(5)), None),
        None,
        dir.path(),
        CancellationToken::new(),
    )
    .with_client_unavailable("Gemini API key not configured");
    let report = RunContext::new(OperationPlan::parse("1,4,8"), services).execute().await;

    let missing = report.entry(OperationId::MissingValues).unwrap();
    assert_eq!(missing.status, OperationStatus::Failed);
    assert!(missing.error.as_deref().unwrap().contains("API key"));
    assert!(report.entry(OperationId::Duplicates).unwrap().status.is_completed());
    assert!(report.entry(OperationId::DataSummary).unwrap().status.is_completed());
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_garbled_table_fails_only_operations_that_need_it() {
    let dir = TempDir::new().unwrap();
    let active_path = dir.path().join("active.csv");
    let removed_path = dir.path().join("removed.csv");
    std::fs::write(
        &active_path,
        "PRODUCT/FEATURE NAME,DESCRIPTION\nNVDA,Screen reader\nJAWS,Screen reader\n",
    )
    .unwrap();
    std::fs::write(&removed_path, b"PRODUCT/FEATURE NAME,DESCRIPTION\n\xff\xfe,bad\n").unwrap();

    let dataset = load_dataset(&active_path, &removed_path, &BTreeMap::new());
    let report = run("4,8,6", dataset, None, test_settings()).await;

    assert_eq!(report.entry(OperationId::Duplicates).unwrap().status, OperationStatus::Success);
    assert_eq!(report.entry(OperationId::DataSummary).unwrap().status, OperationStatus::Success);

    let accidental = report.entry(OperationId::AccidentalRemoval).unwrap();
    assert_eq!(accidental.status, OperationStatus::Failed);
    assert!(accidental.error.as_deref().unwrap().contains("removed.csv"));

    match report.result(OperationId::DataSummary) {
        Some(OperationResult::DataSummary(summary)) => {
            assert_eq!(summary.tables[0].total_rows, 2);
            assert!(!summary.tables[1].present);
            assert!(summary.tables[1].load_error.is_some());
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_complete_audit_runs_all_six() {
    let removed = helpers::datasets::table(
        TableKind::Removed,
        vec![incomplete_record(TableKind::Removed, 0)],
    );
    let report = run(
        "7",
        view(Some(active_table(16)), Some(removed)),
        Some(Arc::new(MockClient::new())),
        test_settings(),
    )
    .await;

    assert_eq!(report.summary.total_operations, 6);
    assert_eq!(report.summary.operations_completed, 6);
    assert_eq!(report.entry(OperationId::MissingValues).unwrap().batches_processed, 2);
    assert_eq!(report.entry(OperationId::Duplicates).unwrap().batches_processed, 0);
    assert!(report.is_consistent());
}

// ============================================================================
// Structural checks through the engine
// ============================================================================

#[tokio::test]
async fn test_exact_name_duplicates_reported() {
    let records = vec![
        a11y_audit::models::ToolRecord::new(TableKind::Active, 0)
            .with_name("VoiceOver ")
            .with_description("Built-in screen reader for Apple devices"),
        a11y_audit::models::ToolRecord::new(TableKind::Active, 1)
            .with_name("Kurzweil 3000")
            .with_description("Literacy software"),
        a11y_audit::models::ToolRecord::new(TableKind::Active, 2)
            .with_name("voiceover")
            .with_description("Gesture tutorial collection"),
    ];
    let table = helpers::datasets::table(TableKind::Active, records);

    let report = run("4", view(Some(table), None), None, test_settings()).await;

    let Some(OperationResult::Duplicates(result)) = report.result(OperationId::Duplicates) else {
        panic!("missing duplicates result");
    };
    assert_eq!(result.active_groups.len(), 1);
    let rows: Vec<usize> = result.active_groups[0].members.iter().map(|m| m.row_index).collect();
    assert_eq!(rows, vec![0, 2]);
    assert!(result.active_groups[0].exact_name);
}

#[tokio::test]
async fn test_accidental_removal_candidate() {
    let active = helpers::datasets::table(
        TableKind::Active,
        vec![a11y_audit::models::ToolRecord::new(TableKind::Active, 0)
            .with_name("Read&Write")
            .with_description("Literacy support toolbar with text to speech and word prediction")],
    );
    let removed = helpers::datasets::table(
        TableKind::Removed,
        vec![
            a11y_audit::models::ToolRecord::new(TableKind::Removed, 0)
                .with_name("Read & Write")
                .with_description("Literacy support toolbar with text to speech and word prediction"),
            a11y_audit::models::ToolRecord::new(TableKind::Removed, 1)
                .with_name("Read&Write")
                .with_description("Literacy support toolbar with text to speech and word prediction")
                .with_notes("Discontinued by vendor"),
        ],
    );

    let report = run("6", view(Some(active), Some(removed)), None, test_settings()).await;

    let Some(OperationResult::AccidentalRemoval(result)) = report.result(OperationId::AccidentalRemoval) else {
        panic!("missing accidental removal result");
    };
    let rows: Vec<usize> = result.candidates.iter().map(|c| c.row_index).collect();
    assert_eq!(rows, vec![0]);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancellation_fails_in_flight_operation_and_keeps_others() {
    let dir = TempDir::new().unwrap();
    let mut settings = test_settings();
    settings.max_concurrent_operations = 1;
    settings.max_concurrent_batches = 1;
    let client: Arc<dyn AnalysisClient> =
        Arc::new(MockClient::new().delayed_batch(1, Duration::from_secs(30)));
    let cancel = CancellationToken::new();
    let services = services_with(
        settings,
        view(Some(active_table(30)), None),
        Some(client),
        dir.path(),
        cancel.clone(),
    );

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(10),
        RunContext::new(OperationPlan::parse("8,1,10"), services).execute(),
    )
    .await
    .expect("run should stop promptly after cancellation");

    assert!(report.entry(OperationId::DataSummary).unwrap().status.is_completed());

    let missing = report.entry(OperationId::MissingValues).unwrap();
    assert_eq!(missing.status, OperationStatus::Failed);
    assert_eq!(missing.batches_processed, 1);
    assert_eq!(missing.batches_failed, 0);
    assert!(missing.error.as_deref().unwrap().contains("Cancelled"));

    // Not started before cancellation
    assert_eq!(report.entry(OperationId::ColumnMapping).unwrap().status, OperationStatus::Failed);
    assert!(report.is_consistent());
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_report_persisted_without_overwriting() {
    let dir = TempDir::new().unwrap();
    let report = run("8", view(Some(active_table(3)), None), None, test_settings()).await;

    let sink = JsonFileSink::new(dir.path());
    let first = sink.persist(&report).unwrap();
    let second = sink.persist(&report).unwrap();
    assert_ne!(first, second);

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&first).unwrap()).unwrap();
    assert_eq!(json["summary"]["total_operations"], 1);
    assert_eq!(json["results"]["data_summary"]["status"], "success");

    let (_, files) = ReportCatalog::new(dir.path()).list().unwrap();
    assert_eq!(files.len(), 2);
}
