//! CLI error types with miette diagnostics.
//!
//! Maps `ConfigError` and `CoreError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use netsync_config::ConfigError;
use netsync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const SOURCE: i32 = 4;
    pub const INCOMPLETE: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(netsync::no_config),
        help(
            "Pass one with --config, or create it at the default location.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("No sources configured")]
    #[diagnostic(
        code(netsync::no_sources),
        help("Add at least one [[sources]] table to {path}")
    )]
    NoSources { path: String },

    #[error("Unknown source '{name}'")]
    #[diagnostic(code(netsync::unknown_source), help("Configured sources: {available}"))]
    UnknownSource { name: String, available: String },

    #[error("Source '{source_name}' has an invalid {field}: {reason}")]
    #[diagnostic(
        code(netsync::invalid_source),
        help("Fix `{field}` in the [[sources]] table named '{source_name}'.")
    )]
    InvalidSource {
        source_name: String,
        field: String,
        reason: String,
    },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netsync::validation))]
    Validation { field: String, reason: String },

    #[error("Could not load configuration: {message}")]
    #[diagnostic(
        code(netsync::config),
        help("Check the TOML syntax and any NETSYNC_* environment variables.")
    )]
    Config { message: String },

    // ── Sources ──────────────────────────────────────────────────────
    #[error("Could not read snapshot {path}: {reason}")]
    #[diagnostic(
        code(netsync::snapshot),
        help("Relative snapshot paths resolve against the config file's directory.")
    )]
    Snapshot { path: String, reason: String },

    // ── Reconciliation ───────────────────────────────────────────────
    #[error("Reconciliation failed: {message}")]
    #[diagnostic(code(netsync::reconcile))]
    Reconcile { message: String },

    #[error("{failed_devices} device(s) failed and {aborted_sources} source pass(es) aborted")]
    #[diagnostic(
        code(netsync::incomplete),
        help("Orphan removal was withheld. Re-run with -v to see each failure.")
    )]
    Incomplete {
        failed_devices: usize,
        aborted_sources: usize,
    },

    // ── Serialization ────────────────────────────────────────────────
    #[error("Could not render JSON: {0}")]
    #[diagnostic(code(netsync::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoConfig { .. }
            | Self::NoSources { .. }
            | Self::InvalidSource { .. }
            | Self::Validation { .. }
            | Self::Config { .. } => exit_code::CONFIG,
            Self::UnknownSource { .. } => exit_code::USAGE,
            Self::Snapshot { .. } => exit_code::SOURCE,
            Self::Incomplete { .. } => exit_code::INCOMPLETE,
            Self::Reconcile { .. } | Self::Json(_) => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ──────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound { path } => CliError::NoConfig {
                path: path.display().to_string(),
            },
            ConfigError::Source {
                source_name,
                field,
                reason,
            } => CliError::InvalidSource {
                source_name,
                field,
                reason,
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other @ (ConfigError::Serialization(_) | ConfigError::Figment(_)) => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Snapshot { path, reason } => CliError::Snapshot { path, reason },
            CoreError::InvalidRule { rule, reason } => CliError::Validation {
                field: format!("rule '{rule}'"),
                reason,
            },
            CoreError::InvalidSubnet { subnet, reason } => CliError::Validation {
                field: format!("subnet '{subnet}'"),
                reason,
            },
            other => CliError::Reconcile {
                message: other.to_string(),
            },
        }
    }
}
