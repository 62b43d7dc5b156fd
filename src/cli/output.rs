//! CLI output formatting

use crate::{
    core::{config::DirectoryLayout, ExecutionStatus, StepState},
    execution::{Artifact, ArtifactReport, DataVerification, ExecutionEvent, FlushOutcome},
    persistence::ExecutionSummary,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Spinner shown while waiting for the downloaded files
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a step state for display
pub fn format_step_state(state: &StepState) -> String {
    match state {
        StepState::Pending => style("PENDING").dim().to_string(),
        StepState::Running { .. } => style("RUNNING").yellow().to_string(),
        StepState::Completed { .. } => style("COMPLETED").green().to_string(),
        StepState::Warned { .. } => style("WARNING").yellow().to_string(),
        StepState::Failed { .. } => style("FAILED").red().to_string(),
        StepState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format a history entry for display
pub fn format_execution_summary(summary: &ExecutionSummary) -> String {
    let status_icon = match summary.status {
        ExecutionStatus::Completed if summary.warnings > 0 => WARN,
        ExecutionStatus::Completed => CHECK,
        ExecutionStatus::Failed => CROSS,
        ExecutionStatus::Running => SPINNER,
        ExecutionStatus::Pending => INFO,
    };

    let mut line = format!(
        "{} {} - {} - {} - {} ({}/{}) - {} artifacts, {} warnings",
        status_icon,
        style(&summary.execution_id.to_string()[..8]).dim(),
        style(summary.started_at.format("%Y-%m-%d %H:%M")).dim(),
        style(&summary.pipeline_name).bold(),
        format_status(summary.status),
        summary.completed_steps,
        summary.total_steps,
        style(summary.artifacts).cyan(),
        style(summary.warnings).yellow()
    );
    if let Some(step) = &summary.failed_step {
        line.push_str(&format!(" - stopped at {}", style(step).red()));
    }
    line
}

/// Format an execution event for display
///
/// Returns `None` for events that are rendered some other way (the flush
/// spinner) or not at all.
pub fn format_execution_event(event: &ExecutionEvent) -> Option<String> {
    let line = match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            total_steps,
        } => format!(
            "{} Starting {} ({} steps, {})",
            ROCKET,
            style(pipeline_name).bold(),
            total_steps,
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StepStarted {
            step,
            position,
            total_steps,
            command_line,
        } => {
            let header = format!(
                "\n[{}/{}] {}",
                style(position).cyan(),
                style(total_steps).dim(),
                style(step.label()).bold()
            );
            match command_line {
                Some(command) => format!("{}\n{} {}", header, SPINNER, style(command).dim()),
                None => header,
            }
        }
        ExecutionEvent::StepCompleted { step } => {
            format!("{} {}", CHECK, style(step.label()).green())
        }
        ExecutionEvent::StepWarning { warning, .. } => {
            format!("{} {}", WARN, style(warning).yellow())
        }
        ExecutionEvent::StepFailed { step, error, fatal } => {
            if *fatal {
                format!(
                    "{} {}: {}",
                    CROSS,
                    style(step.failure_message()).red().bold(),
                    style(error).dim()
                )
            } else {
                format!(
                    "{} {}: {} (continuing)",
                    WARN,
                    style(step.failure_message()).yellow(),
                    style(error).dim()
                )
            }
        }
        ExecutionEvent::WaitingForData { .. } => return None,
        ExecutionEvent::DataSettled { outcome } => match outcome {
            FlushOutcome::Settled { elapsed } => format!(
                "{} Data files ready ({:.1}s)",
                INFO,
                elapsed.as_secs_f64()
            ),
            FlushOutcome::TimedOut { missing, .. } => format!(
                "{} Stopped waiting for {} data file(s)",
                WARN,
                style(missing.len()).yellow()
            ),
            FlushOutcome::Disabled => return None,
        },
        ExecutionEvent::DataVerified { verification } => format_verification(verification),
        ExecutionEvent::ArtifactsListed { .. } => return None,
        ExecutionEvent::PipelineCompleted { status, .. } => match status {
            ExecutionStatus::Completed => return None,
            _ => format!("{} Pipeline {}", INFO, format_status(*status)),
        },
    };
    Some(line)
}

/// Format the data verification result
pub fn format_verification(verification: &DataVerification) -> String {
    let mut lines = Vec::new();
    for file in &verification.present {
        lines.push(format!(
            "  {} {}",
            CHECK,
            verification.dir.join(file).display()
        ));
    }
    for file in &verification.missing {
        lines.push(format!(
            "  {} {}",
            CROSS,
            style(verification.dir.join(file).display()).red()
        ));
    }
    if verification.is_complete() {
        lines.push(format!("{} All data files present", CHECK));
    } else {
        lines.push(format!(
            "{} {}",
            WARN,
            style("Some data files are missing. Analysis may be incomplete.").yellow()
        ));
    }
    lines.join("\n")
}

/// Format the end-of-run summary: directories, then generated artifacts
pub fn format_summary(directories: &DirectoryLayout, report: &ArtifactReport) -> String {
    let mut lines = vec![
        format!("\n{}", style("Analysis Summary:").bold()),
        format!(
            "Raw results directory: {}",
            style(directories.raw_results_dir.display()).cyan()
        ),
        format!(
            "Organized results directory: {}",
            style(directories.organized_results_dir.display()).cyan()
        ),
        format!(
            "Analysis results directory: {}",
            style(directories.analysis_dir.display()).cyan()
        ),
    ];

    lines.extend(format_artifacts(report));
    lines.join("\n")
}

/// Format the artifact listing alone
pub fn format_artifacts(report: &ArtifactReport) -> Vec<String> {
    let mut lines = Vec::new();

    if report.is_empty() {
        lines.push(format!(
            "\n{} {}",
            WARN,
            style("No results were generated").yellow()
        ));
        return lines;
    }

    lines.push(format!("\n{}", style("Generated visualizations:").bold()));
    lines.extend(artifact_lines(report.visualizations(), &report.dir));

    lines.push(format!("\n{}", style("Generated comparison tables:").bold()));
    lines.extend(artifact_lines(report.tables(), &report.dir));

    lines
}

fn artifact_lines<'a>(artifacts: impl Iterator<Item = &'a Artifact>, dir: &Path) -> Vec<String> {
    let lines: Vec<String> = artifacts
        .map(|a| {
            let name = a.path.strip_prefix(dir).unwrap_or(&a.path);
            format!(
                "  {} {}",
                name.display(),
                style(format!("({})", format_size(a.size))).dim()
            )
        })
        .collect();

    if lines.is_empty() {
        vec![format!("  {}", style("none").dim())]
    } else {
        lines
    }
}

/// Human-readable file size
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let value = bytes as f64;
    if value < KB {
        format!("{} B", bytes)
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{:.1} MB", value / MB)
    }
}

/// Human-readable duration
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
