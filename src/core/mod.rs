//! Core domain models for the analysis pipeline
//!
//! This module defines the configuration, the fixed step list, and the
//! runtime state of a run.

pub mod config;
pub mod pipeline;
pub mod step;
pub mod context;
pub mod state;

pub use pipeline::*;
pub use step::*;
pub use context::*;
pub use state::*;
