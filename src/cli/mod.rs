//! Gembites Command Line Interface.
//!
//! Operator tools: configuration setup, parameter inspection, seeded
//! simulations, key generation and health checks of saved snapshots.

pub mod commands;
pub mod config;
pub mod output;

pub use commands::*;
pub use config::*;
pub use output::*;

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// CLI APPLICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI Application state
#[derive(Debug)]
pub struct CliApp {
    /// Configuration
    config: CliConfig,
    /// Output formatter
    output: OutputFormatter,
    /// Verbose mode
    verbose: bool,
}

impl CliApp {
    /// Create new CLI application
    pub fn new(config: CliConfig) -> Self {
        let output = OutputFormatter::new(config.output_format).with_color(config.color);
        Self {
            config,
            output,
            verbose: false,
        }
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output = OutputFormatter::new(format).with_color(self.config.color);
        self
    }

    /// Get configuration
    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    /// Get output formatter
    pub fn output(&self) -> &OutputFormatter {
        &self.output
    }

    /// Check if verbose
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Execute a command
    pub fn execute(&self, command: &Command) -> CliResult<CommandOutput> {
        if self.verbose {
            self.output.info(&format!("Executing: {:?}", command));
        }

        match command {
            Command::Init(cmd) => cmd.execute(self),
            Command::Params(cmd) => cmd.execute(self),
            Command::Keys(cmd) => cmd.execute(self),
            Command::Health(cmd) => cmd.execute(self),
        }
    }
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new(CliConfig::default())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLI RESULT
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI Error types
#[derive(Error, Debug, Clone)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
    /// Command execution error
    #[error("Execution error: {0}")]
    Execution(String),
    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<crate::error::Error> for CliError {
    fn from(e: crate::error::Error) -> Self {
        match e {
            crate::error::Error::Io(msg) => CliError::Io(msg),
            crate::error::Error::Config(msg) => CliError::Config(msg),
            other => CliError::Execution(other.to_string()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

/// CLI Result type
pub type CliResult<T> = std::result::Result<T, CliError>;

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// Command execution output
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Success status
    pub success: bool,
    /// Output message
    pub message: String,
    /// Structured data (JSON serializable)
    pub data: Option<serde_json::Value>,
    /// Warnings
    pub warnings: Vec<String>,
}

impl CommandOutput {
    /// Create success output
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            warnings: Vec::new(),
        }
    }

    /// Create success with data
    pub fn success_with_data(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            warnings: Vec::new(),
        }
    }

    /// Create error output
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            warnings: Vec::new(),
        }
    }

    /// Add warning
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Print through `formatter`
    pub fn render(&self, formatter: &OutputFormatter) {
        if self.success {
            formatter.success(&self.message);
        } else {
            formatter.error(&self.message);
        }
        if let Some(data) = &self.data {
            formatter.data(data);
        }
        for warning in &self.warnings {
            formatter.warning(warning);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Trait for executable commands
pub trait Executable {
    /// Execute the command
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
