use thiserror::Error;

/// Top-level error type for the `waterpanel-api` crate.
///
/// Covers every failure mode of both wire clients: HTTP transport, REST
/// status and body decoding, and the MQTT session. `waterpanel-core` maps
/// these into its connection taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request or connect attempt timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── REST ────────────────────────────────────────────────────────
    /// The tag service answered with a non-2xx status.
    #[error("Tag service returned HTTP {status}")]
    HttpStatus { status: u16, body: String },

    // ── MQTT ────────────────────────────────────────────────────────
    /// MQTT connection failed or dropped.
    #[error("MQTT connection failed: {0}")]
    MqttConnect(String),

    /// Request could not be queued on the MQTT client.
    #[error("MQTT client error: {0}")]
    MqttClient(#[from] rumqttc::ClientError),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the peer was never reached (as opposed to answering
    /// with something we could not use).
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Timeout { .. } | Self::MqttConnect(_) | Self::InvalidUrl(_) => true,
            _ => false,
        }
    }

    /// HTTP status code, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
