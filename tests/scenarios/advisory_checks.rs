//! Test: Advisory checks - verification and analysis warnings never stop the run

use crate::helpers::*;
use analysis_pipeline::core::{StepKind, StepState};
use analysis_pipeline::execution::ExecutionEvent;

/// Missing data files only warn; the analysis still runs
#[tokio::test]
async fn test_missing_data_files_warn_and_continue() {
    let ws = Workspace::new();
    let runner = MockRunner::new();

    let result = run_with(&ws.config, runner).await;

    assert!(result.is_success());
    assert_eq!(result.exit_code(), 0);
    assert_eq!(
        result.invoked_steps(),
        vec!["setup_check", "download_data", "analysis"]
    );
    assert!(matches!(
        result.step_state(StepKind::VerifyData),
        StepState::Warned { .. }
    ));
    assert!(result.has_warning("corpus.json"));
    assert!(result.has_warning("nq_train.json"));
    assert!(result.has_warning("nq_test.json"));
}

/// Only the files that are actually absent are reported
#[tokio::test]
async fn test_partial_data_reports_missing_only() {
    let ws = Workspace::new();
    let runner = MockRunner::new().writes(
        StepKind::DownloadData,
        ws.data_dir().join("corpus.json"),
        "{}",
    );

    let result = run_with(&ws.config, runner).await;

    let verification = result
        .events
        .iter()
        .find_map(|e| match e {
            ExecutionEvent::DataVerified { verification } => Some(verification.clone()),
            _ => None,
        })
        .expect("verification event");
    assert_eq!(verification.present, vec!["corpus.json"]);
    assert_eq!(verification.missing, vec!["nq_train.json", "nq_test.json"]);
    assert!(result.is_success());
}

/// Complete data gives a clean verification step
#[tokio::test]
async fn test_complete_data_verifies_cleanly() {
    let ws = Workspace::new();
    let runner = ws.downloading_runner();

    let result = run_with(&ws.config, runner).await;

    assert!(matches!(
        result.step_state(StepKind::VerifyData),
        StepState::Completed { .. }
    ));
    assert!(!result.has_warning("Missing data files"));
}

/// By default a failing analysis is reported but the run still completes
#[tokio::test]
async fn test_analysis_failure_warns_by_default() {
    let ws = Workspace::new();
    ws.seed_data_files();
    let runner = MockRunner::new().exit_with(StepKind::Analysis, 1);

    let result = run_with(&ws.config, runner).await;

    assert!(result.is_success());
    assert_eq!(result.exit_code(), 0);
    assert!(matches!(
        result.step_state(StepKind::Analysis),
        StepState::Failed { exit_code: Some(1), .. }
    ));
    assert!(result.has_warning("Analysis run failed: exited with code 1"));
    assert!(result
        .events
        .iter()
        .any(|e| matches!(e, ExecutionEvent::ArtifactsListed { .. })));
}
