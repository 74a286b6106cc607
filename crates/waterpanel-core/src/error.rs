// ── Core error types ──
//
// The connection taxonomy the supervisor branches on. Consumers never see
// reqwest or rumqttc errors directly; the `From<waterpanel_api::Error>` impl
// folds transport-layer failures into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Transport ────────────────────────────────────────────────────
    #[error("Cannot reach {target}: {reason}")]
    TransportUnreachable { target: String, reason: String },

    #[error("Timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data ─────────────────────────────────────────────────────────
    /// The tag is present but carries the -105 "no data" marker.
    #[error("Tag {tag} has no data (-105)")]
    NoDataSentinel { tag: String },

    #[error("Tag {tag} missing from response")]
    MissingTag { tag: String },

    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String },

    // ── User interaction ─────────────────────────────────────────────
    #[error("Cancelled by user")]
    UserCancelled,

    #[error("MQTT only connects to a local broker (127.0.0.1 or localhost), got '{host}'")]
    HostRejected { host: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` when the peer answered but the answer was not usable data.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            Self::NoDataSentinel { .. } | Self::MissingTag { .. } | Self::MalformedPayload { .. }
        )
    }

    /// `true` when the peer could not be reached or answered with a failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::TransportUnreachable { .. } | Self::Timeout { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<waterpanel_api::Error> for CoreError {
    fn from(err: waterpanel_api::Error) -> Self {
        match err {
            waterpanel_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else {
                    CoreError::TransportUnreachable {
                        target: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            waterpanel_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            waterpanel_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            waterpanel_api::Error::HttpStatus { status, .. } => CoreError::TransportUnreachable {
                target: "tag service".into(),
                reason: format!("HTTP status {status}"),
            },
            waterpanel_api::Error::MqttConnect(reason) => CoreError::TransportUnreachable {
                target: "MQTT broker".into(),
                reason,
            },
            waterpanel_api::Error::MqttClient(e) => CoreError::TransportUnreachable {
                target: "MQTT broker".into(),
                reason: e.to_string(),
            },
            waterpanel_api::Error::Deserialization { message, body: _ } => {
                CoreError::MalformedPayload { message }
            }
        }
    }
}
