//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help text
//! and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use waterpanel_config::ConfigError;
use waterpanel_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const NO_DATA: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {target}")]
    #[diagnostic(
        code(waterpanel::connection_failed),
        help(
            "{reason}\n\
             Check that the service is running and the host is correct.\n\
             Try: waterpanel probe --host <HOST>"
        )
    )]
    ConnectionFailed { target: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(waterpanel::timeout),
        help("Raise request_timeout_ms in the config file or check the service.")
    )]
    Timeout { seconds: u64 },

    // ── Data ─────────────────────────────────────────────────────────
    #[error("No data: {reason}")]
    #[diagnostic(
        code(waterpanel::no_data),
        help(
            "The service answered but the value was missing or marked as -105.\n\
             Check display_tag and tag_names in your configuration."
        )
    )]
    NoData { reason: String },

    // ── Input ────────────────────────────────────────────────────────
    #[error("MQTT only connects to a local broker, got '{host}'")]
    #[diagnostic(
        code(waterpanel::host_rejected),
        help("Use --host 127.0.0.1 or --host localhost, or choose REST.")
    )]
    HostRejected { host: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(waterpanel::validation))]
    Validation { field: String, reason: String },

    #[error("Cancelled")]
    #[diagnostic(code(waterpanel::cancelled))]
    Cancelled,

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(waterpanel::config),
        help("Run: waterpanel config path   to see which files are read.")
    )]
    Config(#[from] ConfigError),

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(waterpanel::internal))]
    Internal(String),

    #[error("JSON serialization failed: {0}")]
    #[diagnostic(code(waterpanel::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NoData { .. } => exit_code::NO_DATA,
            Self::HostRejected { .. } | Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::TransportUnreachable { target, reason } => {
                CliError::ConnectionFailed { target, reason }
            }
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            e @ (CoreError::NoDataSentinel { .. }
            | CoreError::MissingTag { .. }
            | CoreError::MalformedPayload { .. }) => CliError::NoData {
                reason: e.to_string(),
            },
            CoreError::UserCancelled => CliError::Cancelled,
            CoreError::HostRejected { host } => CliError::HostRejected { host },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
