//! Pipeline context - variables available to argument templates

use crate::core::config::DirectoryLayout;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Execution context for a pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineContext {
    /// Scalar variables (directory paths, pipeline name)
    pub variables: HashMap<String, String>,

    /// List variables (model names); order is significant
    pub lists: HashMap<String, Vec<String>>,
}

impl PipelineContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the context for one run
    pub fn for_run(name: &str, directories: &DirectoryLayout, models: &[String]) -> Self {
        let mut context = Self::new();
        context.set_variable("pipeline_name".to_string(), name.to_string());
        for (key, dir) in directories.entries() {
            context.set_variable(key.to_string(), dir.display().to_string());
        }
        context.set_list("models".to_string(), models.to_vec());
        context
    }

    /// Set a variable
    pub fn set_variable(&mut self, key: String, value: String) {
        self.variables.insert(key, value);
    }

    /// Get a variable
    pub fn get_variable(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }

    /// Set a list variable
    pub fn set_list(&mut self, key: String, items: Vec<String>) {
        self.lists.insert(key, items);
    }

    /// Get a list variable
    pub fn get_list(&self, key: &str) -> Option<&Vec<String>> {
        self.lists.get(key)
    }
}
