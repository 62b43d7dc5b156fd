//! Test: Artifact summary - the listing reflects what is in the analysis directory

use crate::helpers::*;
use analysis_pipeline::core::StepKind;
use analysis_pipeline::execution::{scan_artifacts, ArtifactKind};

fn names(paths: impl Iterator<Item = std::path::PathBuf>) -> Vec<String> {
    paths
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

/// Only .png and .csv files are listed, sorted, by kind
#[tokio::test]
async fn test_summary_lists_current_files() {
    let ws = Workspace::new();
    let analysis = ws.analysis_dir().to_path_buf();
    let runner = MockRunner::new()
        .writes(StepKind::Analysis, analysis.join("b_plot.png"), "png")
        .writes(StepKind::Analysis, analysis.join("a_plot.PNG"), "png")
        .writes(StepKind::Analysis, analysis.join("scores.csv"), "m,s")
        .writes(StepKind::Analysis, analysis.join("notes.txt"), "ignored");

    let result = run_with(&ws.config, runner).await;

    let report = result.result.as_ref().unwrap().artifacts.clone().unwrap();
    assert_eq!(
        names(report.visualizations().map(|a| a.path.clone())),
        vec!["a_plot.PNG", "b_plot.png"]
    );
    assert_eq!(names(report.tables().map(|a| a.path.clone())), vec!["scores.csv"]);
    assert_eq!(report.len(), 3);
    assert!(!result.has_warning("No results were generated"));
}

/// An empty analysis directory yields the "no results" warning
#[tokio::test]
async fn test_no_results_warning() {
    let ws = Workspace::new();
    ws.seed_data_files();

    let result = run_with(&ws.config, MockRunner::new()).await;

    assert!(result.is_success());
    assert!(result.result.as_ref().unwrap().artifacts.as_ref().unwrap().is_empty());
    assert!(result.has_warning("No results were generated"));
}

/// Files left from an earlier run are listed as well (the directory is not cleaned)
#[tokio::test]
async fn test_existing_files_are_listed() {
    let ws = Workspace::new();
    std::fs::create_dir_all(ws.analysis_dir()).unwrap();
    std::fs::write(ws.analysis_dir().join("old.csv"), "x").unwrap();

    let result = run_with(&ws.config, MockRunner::new()).await;

    let report = result.result.as_ref().unwrap().artifacts.clone().unwrap();
    assert_eq!(names(report.tables().map(|a| a.path.clone())), vec!["old.csv"]);
}

/// Subdirectories are only searched when asked to
#[test]
fn test_recursive_listing_is_opt_in() {
    let ws = Workspace::new();
    let nested = ws.analysis_dir().join("per_model");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(nested.join("llama2.png"), "png").unwrap();

    assert!(scan_artifacts(ws.analysis_dir(), false).is_empty());

    let report = scan_artifacts(ws.analysis_dir(), true);
    assert_eq!(report.len(), 1);
    assert_eq!(report.artifacts[0].kind, ArtifactKind::Visualization);
}

/// A missing analysis directory is an empty listing, not an error
#[test]
fn test_missing_directory_is_empty() {
    let ws = Workspace::new();
    let report = scan_artifacts(&ws.path("does/not/exist"), false);
    assert!(report.is_empty());
}
