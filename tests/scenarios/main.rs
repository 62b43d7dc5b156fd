//! Scenario-based tests for the analysis pipeline

mod helpers;

mod advisory_checks;
mod analysis_arguments;
mod artifact_summary;
mod fatal_steps;
