use analysis_pipeline::cli::commands::{
    HistoryCommand, RunCommand, SummaryCommand, ValidateCommand, VerifyCommand,
};
use analysis_pipeline::cli::output::*;
use analysis_pipeline::cli::{Cli, Command};
use analysis_pipeline::core::config::PipelineConfig;
use analysis_pipeline::execution::{
    scan_artifacts, verify_data_files, ExecutionEngine, ExecutionEvent, RunReport,
};
use analysis_pipeline::persistence::{
    create_summary, open_run_history, ExecutionSummary, InMemoryPersistence, PersistenceBackend,
};
use analysis_pipeline::runner::{environment, ChildEnvironment, SubprocessRunner};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[cfg(feature = "sqlite")]
use analysis_pipeline::persistence::SqliteExecutionStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr);
    if std::env::var_os("RUST_LOG").is_some() {
        tracing::subscriber::set_global_default(
            builder.with_env_filter(EnvFilter::from_default_env()).finish(),
        )
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
    .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, &cli).await?,
        Command::Validate(cmd) => validate_pipeline(cmd, &cli)?,
        Command::Verify(cmd) => verify_data(cmd, &cli)?,
        Command::Summary(cmd) => show_summary(cmd, &cli)?,
        Command::History(cmd) => show_history(cmd, &cli).await?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    PipelineConfig::load(cli.config.as_deref()).context("Failed to load pipeline config")
}

async fn open_history() -> Result<Arc<dyn PersistenceBackend>> {
    #[cfg(feature = "sqlite")]
    {
        Ok(Arc::new(SqliteExecutionStore::with_default_path().await?))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        Ok(Arc::new(InMemoryPersistence::new()))
    }
}

/// Store for a finished run; never fails the run itself
async fn run_history(disabled: bool) -> Arc<dyn PersistenceBackend> {
    if disabled {
        return Arc::new(InMemoryPersistence::new());
    }

    #[cfg(feature = "sqlite")]
    let db_path = SqliteExecutionStore::default_path();
    #[cfg(not(feature = "sqlite"))]
    let db_path = Err(anyhow::anyhow!("built without the sqlite feature"));

    open_run_history(db_path).await
}

async fn run_pipeline(cmd: &RunCommand, cli: &Cli) -> Result<()> {
    let mut config = load_config(cli)?;
    cmd.apply_to(&mut config);
    config.validate().context("Invalid pipeline configuration")?;

    if config.environment.load_dotenv {
        environment::load_dotenv(Path::new(".env"));
    }
    let child_env = ChildEnvironment::from_process(&config.environment, &cmd.env)
        .context("Failed to prepare child environment")?;

    if !cmd.json {
        println!(
            "{} Loaded pipeline: {} ({})",
            INFO,
            style(&config.name).bold(),
            style(config.models.join(", ")).cyan()
        );
    }

    let mut pipeline = config.to_pipeline();
    // With --json our stdout carries only the report
    let runner = if cmd.json {
        SubprocessRunner::new().with_stdout_to_stderr()
    } else {
        SubprocessRunner::new()
    };
    let engine = ExecutionEngine::new(runner, child_env);

    // Console output for events; the flush wait gets a spinner
    if !cmd.json {
        let spinner: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));
        engine
            .add_event_handler(move |event| {
                match &event {
                    ExecutionEvent::WaitingForData {
                        files,
                        timeout_secs,
                    } if *timeout_secs > 0 => {
                        if let Ok(mut slot) = spinner.lock() {
                            *slot = Some(create_spinner(format!(
                                "Waiting for {} data file(s) to settle (up to {}s)",
                                files.len(),
                                timeout_secs
                            )));
                        }
                    }
                    ExecutionEvent::DataSettled { .. } => {
                        if let Some(bar) = spinner.lock().ok().and_then(|mut slot| slot.take()) {
                            bar.finish_and_clear();
                        }
                    }
                    _ => {}
                }
                if let Some(line) = format_execution_event(&event) {
                    println!("{}", line);
                }
            })
            .await;
    }

    let result = engine.execute(&mut pipeline).await;

    let report = match &result {
        Ok(report) => report.clone(),
        Err(e) => RunReport::from_pipeline(&pipeline, e.artifacts().cloned()),
    };

    // Save to history
    let store = run_history(cmd.no_history).await;
    let summary = create_summary(&pipeline, report.artifacts.as_ref());
    if let Err(e) = store.save_execution(&summary).await {
        error!("Failed to save run history: {:#}", e);
    } else if !cmd.no_history {
        debug!("Saved run {} to history", summary.execution_id);
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(artifacts) = &report.artifacts {
        println!("{}", format_summary(&pipeline.directories, artifacts));
    }

    match result {
        Ok(_) => {
            if !cmd.json {
                let warnings = pipeline.state.warnings.len();
                if warnings == 0 {
                    println!(
                        "\n{} {} completed {}",
                        CHECK,
                        style(&pipeline.name).bold(),
                        style("successfully").green()
                    );
                } else {
                    println!(
                        "\n{} {} completed with {} warning(s)",
                        WARN,
                        style(&pipeline.name).bold(),
                        style(warnings).yellow()
                    );
                }
            }
        }
        Err(e) => {
            if !cmd.json {
                println!();
                for step in &report.steps {
                    println!("  {} {}", format_step_state(&step.state), step.label);
                }
                println!(
                    "\n{} {} {}",
                    CROSS,
                    style(&pipeline.name).bold(),
                    style("failed").red()
                );
            }
            error!("{}", e);
            std::process::exit(report.exit_code());
        }
    }

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand, cli: &Cli) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    match load_config(cli) {
        Ok(config) => {
            let pipeline = config.to_pipeline();
            let context = pipeline.context();

            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Models: {}", style(config.models.join(", ")).cyan());
            for (key, dir) in config.directories.entries() {
                println!("  {}: {}", key, style(dir.display()).dim());
            }
            for step in &pipeline.steps {
                let detail = match step.command() {
                    Some(command) => {
                        analysis_pipeline::execution::engine::render_command_line(command, &context)
                    }
                    None => format!("check {}", config.data_files.join(", ")),
                };
                println!(
                    "  {} {} {}",
                    style(step.id()).bold(),
                    style(if step.is_fatal() { "(fatal)" } else { "(advisory)" }).dim(),
                    detail
                );
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

fn verify_data(cmd: &VerifyCommand, cli: &Cli) -> Result<()> {
    let mut config = load_config(cli)?;
    cmd.directories.apply(&mut config.directories);

    let verification = verify_data_files(&config.directories.raw_data_dir, &config.data_files);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&verification)?);
    } else {
        println!(
            "{} Checking data files in {}",
            INFO,
            style(verification.dir.display()).cyan()
        );
        println!("{}", format_verification(&verification));
    }

    // Advisory check: missing files are reported, never an error
    Ok(())
}

fn show_summary(cmd: &SummaryCommand, cli: &Cli) -> Result<()> {
    let mut config = load_config(cli)?;
    cmd.directories.apply(&mut config.directories);

    let recursive = cmd.recursive || config.summary.recursive;
    let report = scan_artifacts(&config.directories.analysis_dir, recursive);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_summary(&config.directories, &report));
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand, cli: &Cli) -> Result<()> {
    let store = open_history().await?;

    // If specific execution ID is requested
    if let Some(exec_id_str) = &cmd.execution_id {
        let exec_id = uuid::Uuid::parse_str(exec_id_str)
            .context("Invalid execution ID format")?;

        match store.load_execution(exec_id).await? {
            Some(summary) => print_execution_details(&summary, cli.verbose || cmd.json)?,
            None => println!("{} Execution not found", WARN),
        }
        return Ok(());
    }

    let mut executions = match &cmd.pipeline {
        Some(pipeline_name) => store.list_executions(pipeline_name).await?,
        None => store.list_recent(cmd.limit).await?,
    };
    executions.truncate(cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "executions": executions });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if executions.is_empty() {
        println!("{} No executions found", INFO);
        return Ok(());
    }

    println!("{} Execution history (showing latest {}):", INFO, cmd.limit);
    for summary in &executions {
        println!("  {}", format_execution_summary(summary));
    }

    Ok(())
}

fn print_execution_details(summary: &ExecutionSummary, verbose: bool) -> Result<()> {
    println!("{} Execution Details", INFO);
    println!("  ID: {}", style(summary.execution_id).cyan());
    println!("  Pipeline: {}", style(&summary.pipeline_name).bold());
    println!("  Status: {}", format_status(summary.status));
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Steps: {}/{}",
        summary.completed_steps, summary.total_steps
    );
    println!("  Warnings: {}", style(summary.warnings).yellow());
    println!("  Artifacts: {}", style(summary.artifacts).cyan());
    if let Some(step) = &summary.failed_step {
        println!("  Stopped at: {}", style(step).red());
    }

    if verbose {
        println!("\n  {}", style("Full details:").bold());
        let json = serde_json::to_string_pretty(summary)?;
        for line in json.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}
