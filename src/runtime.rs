//! Host-facing runtime
//!
//! Ties configuration, the registry and the interpreter together the way a
//! host (the CLI, or a request handler) uses them: every run rebuilds the
//! registry so it always reflects what is on disk.

use serde::Serialize;
use std::path::Path;

use crate::config::Config;
use crate::interpreter::execute;
use crate::plugin::{list_functions, CommandRegistry, PluginError};

/// Result of one run, serialized as `{"output": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutput {
    pub output: String,
}

/// Runs scripts against the functions directory of a [`Config`]
#[derive(Debug, Clone)]
pub struct Runtime {
    config: Config,
}

impl Runtime {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn functions_dir(&self) -> &Path {
        &self.config.functions_dir
    }

    /// Load a fresh registry from the functions directory
    pub fn registry(&self) -> CommandRegistry {
        CommandRegistry::build(&self.config.functions_dir)
    }

    /// Execute `code` against freshly loaded commands
    pub fn run(&self, code: &str) -> RunOutput {
        let mut registry = self.registry();
        tracing::debug!(commands = ?registry.names(), "registry built");
        RunOutput {
            output: execute(code, &mut registry),
        }
    }

    /// Names of the commands available in the functions directory
    pub fn list_functions(&self) -> Result<Vec<String>, PluginError> {
        list_functions(&self.config.functions_dir)
    }
}
