//! Test: Analysis arguments - directories and models reach the analysis program

use crate::helpers::*;
use analysis_pipeline::core::config::{CommandConfig, PipelineConfig};
use analysis_pipeline::core::StepKind;
use analysis_pipeline::runner::ChildEnvironment;

fn expected_args(config: &PipelineConfig) -> Vec<String> {
    let dirs = &config.directories;
    let mut args = vec![
        "-m".to_string(),
        "src.run_complete_analysis".to_string(),
        "--raw_results_dir".to_string(),
        dirs.raw_results_dir.display().to_string(),
        "--organized_results_dir".to_string(),
        dirs.organized_results_dir.display().to_string(),
        "--analysis_dir".to_string(),
        dirs.analysis_dir.display().to_string(),
        "--models".to_string(),
    ];
    args.extend(config.models.iter().cloned());
    args
}

/// The analysis gets the configured directories and the default models in order
#[tokio::test]
async fn test_default_analysis_arguments() {
    let ws = Workspace::new();
    ws.seed_data_files();

    let result = run_with(&ws.config, MockRunner::new()).await;

    let call = result.call(StepKind::Analysis).expect("analysis ran");
    assert_eq!(call.program, "python");
    assert_eq!(call.args, expected_args(&ws.config));
    assert_eq!(
        &call.args[call.args.len() - 4..],
        &["Llama2", "MPT", "Phi-2", "Falcon"]
    );
}

/// Model order given by the caller is kept as is
#[tokio::test]
async fn test_model_order_is_preserved() {
    let mut ws = Workspace::new();
    ws.config.models = vec!["Falcon".into(), "Llama2".into(), "Phi-2".into()];

    let result = run_with(&ws.config, MockRunner::new()).await;

    let call = result.call(StepKind::Analysis).unwrap();
    assert_eq!(&call.args[call.args.len() - 3..], &["Falcon", "Llama2", "Phi-2"]);
}

/// The setup and download steps run their fixed scripts
#[tokio::test]
async fn test_setup_and_download_commands() {
    let ws = Workspace::new();

    let result = run_with(&ws.config, MockRunner::new()).await;

    let setup = result.call(StepKind::SetupCheck).unwrap();
    assert_eq!(setup.program, "python");
    assert_eq!(setup.args, vec!["src/setup_check.py"]);

    let download = result.call(StepKind::DownloadData).unwrap();
    assert_eq!(download.args, vec!["src/download_data.py"]);
}

/// Command overrides from YAML are rendered with the run's variables
#[tokio::test]
async fn test_overridden_analysis_command() {
    let mut ws = Workspace::new();
    ws.config.steps.analysis = CommandConfig {
        program: Some("python3".to_string()),
        args: Some(vec![
            "analyze.py".to_string(),
            "--data={{ raw_data_dir }}".to_string(),
            "--models={{ models }}".to_string(),
        ]),
        timeout_secs: Some(600),
    };

    let result = run_with(&ws.config, MockRunner::new()).await;

    let call = result.call(StepKind::Analysis).unwrap();
    assert_eq!(call.program, "python3");
    assert_eq!(
        call.args,
        vec![
            "analyze.py".to_string(),
            format!("--data={}", ws.data_dir().display()),
            "--models=Llama2,MPT,Phi-2,Falcon".to_string(),
        ]
    );
}

/// Every step sees the extended module search path
#[tokio::test]
async fn test_search_path_reaches_every_step() {
    let ws = Workspace::new();
    let env = ChildEnvironment::build(
        &ws.config.environment,
        ws.dir.path(),
        Some(search_path(&["/opt/lib"])),
        &[("HF_TOKEN".to_string(), "secret".to_string())],
    )
    .unwrap();

    let result = run_with_env(&ws.config, MockRunner::new(), env).await;

    let expected = search_path(&["/opt/lib", ws.dir.path().to_str().unwrap()]);
    assert_eq!(result.calls.len(), 3);
    for call in &result.calls {
        assert_eq!(call.env.get("PYTHONPATH"), Some(expected.as_os_str()));
        assert_eq!(
            call.env.get("HF_TOKEN"),
            Some(std::ffi::OsStr::new("secret"))
        );
    }
}
