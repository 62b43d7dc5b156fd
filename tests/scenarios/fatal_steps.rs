//! Test: Fatal steps - setup and download failures stop the run

use crate::helpers::*;
use analysis_pipeline::core::{ExecutionStatus, StepKind, StepState};
use analysis_pipeline::execution::{ExecutionEvent, PipelineError};

/// A failing setup check runs nothing else
#[tokio::test]
async fn test_setup_failure_stops_run() {
    let ws = Workspace::new();
    let runner = MockRunner::new().exit_with(StepKind::SetupCheck, 1);

    let result = run_with(&ws.config, runner).await;

    assert!(!result.is_success());
    assert_eq!(result.exit_code(), 1);
    assert_eq!(result.invoked_steps(), vec!["setup_check"]);
    assert_skipped(&result, StepKind::DownloadData);
    assert_skipped(&result, StepKind::VerifyData);
    assert_skipped(&result, StepKind::Analysis);

    let err = result.result.as_ref().unwrap_err();
    assert_eq!(err.step(), StepKind::SetupCheck);
    assert!(err.to_string().starts_with("Setup check failed"));
}

/// A failing download never reaches the analysis
#[tokio::test]
async fn test_download_failure_stops_run() {
    let ws = Workspace::new();
    let runner = MockRunner::new().exit_with(StepKind::DownloadData, 3);

    let result = run_with(&ws.config, runner).await;

    assert_eq!(result.exit_code(), 1);
    assert_eq!(result.invoked_steps(), vec!["setup_check", "download_data"]);
    assert!(result.call(StepKind::Analysis).is_none());
    assert!(matches!(
        result.step_state(StepKind::DownloadData),
        StepState::Failed { exit_code: Some(3), .. }
    ));
    assert_skipped(&result, StepKind::Analysis);

    match result.result.as_ref().unwrap_err() {
        PipelineError::StepAborted {
            step, exit_code, ..
        } => {
            assert_eq!(*step, StepKind::DownloadData);
            assert_eq!(*exit_code, Some(3));
        }
    }
    assert!(result
        .result
        .as_ref()
        .unwrap_err()
        .to_string()
        .starts_with("Data download failed"));
}

/// A program that cannot be started counts as a failure
#[tokio::test]
async fn test_spawn_error_is_fatal() {
    let ws = Workspace::new();
    let runner = MockRunner::new().fail_to_spawn(StepKind::SetupCheck, "python: not found");

    let result = run_with(&ws.config, runner).await;

    assert_eq!(result.exit_code(), 1);
    match result.step_state(StepKind::SetupCheck) {
        StepState::Failed {
            error, exit_code, ..
        } => {
            assert!(error.contains("python: not found"));
            assert_eq!(*exit_code, None);
        }
        other => panic!("expected failed setup check, got {:?}", other),
    }
}

/// Aborting still reports a finished (failed) pipeline to listeners
#[tokio::test]
async fn test_abort_emits_failed_completion() {
    let ws = Workspace::new();
    let runner = MockRunner::new().exit_with(StepKind::SetupCheck, 1);

    let result = run_with(&ws.config, runner).await;

    assert!(matches!(
        result.events.last(),
        Some(ExecutionEvent::PipelineCompleted {
            status: ExecutionStatus::Failed,
            ..
        })
    ));
    assert!(!result
        .events
        .iter()
        .any(|e| matches!(e, ExecutionEvent::ArtifactsListed { .. })));
}

/// With --strict a failing analysis aborts too, but what it wrote is still listed
#[tokio::test]
async fn test_strict_analysis_failure_is_fatal() {
    let mut ws = Workspace::new();
    ws.seed_data_files();
    ws.config.analysis_failure = analysis_pipeline::core::config::FailurePolicy::Abort;
    let runner = MockRunner::new()
        .writes(StepKind::Analysis, ws.analysis_dir().join("table1.csv"), "model,score")
        .exit_with(StepKind::Analysis, 2);

    let result = run_with(&ws.config, runner).await;

    assert_eq!(result.exit_code(), 1);
    let err = result.result.as_ref().unwrap_err();
    assert!(err.to_string().starts_with("Analysis run failed"));

    let artifacts = err.artifacts().expect("analysis was reached");
    assert_eq!(artifacts.len(), 1);
    assert_eq!(
        artifacts.tables().next().unwrap().path,
        ws.analysis_dir().join("table1.csv")
    );
    assert!(result
        .events
        .iter()
        .any(|e| matches!(e, ExecutionEvent::ArtifactsListed { .. })));
}

/// Aborting before the analysis leaves nothing to list
#[tokio::test]
async fn test_early_abort_has_no_listing() {
    let ws = Workspace::new();
    let runner = MockRunner::new().exit_with(StepKind::DownloadData, 1);

    let result = run_with(&ws.config, runner).await;

    assert!(result.result.as_ref().unwrap_err().artifacts().is_none());
}
