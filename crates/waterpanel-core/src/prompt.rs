// ── User interaction seam ──
//
// The supervisor asks for a transport and a host, and reports outcomes as
// notices. The CLI answers with terminal prompts; tests answer from a script.

use std::fmt;
use std::future::Future;

use crate::config::{ConnectionConfig, Transport};
use crate::error::CoreError;

/// Alert-style messages the supervisor surfaces to the user.
#[derive(Debug, Clone)]
pub enum Notice {
    /// MQTT was chosen with a host other than this machine.
    HostRejected { host: String },
    /// The host prompt was dismissed.
    Cancelled,
    /// The service could not be reached (probe or source start).
    TransportFailed {
        transport: Transport,
        host: String,
        error: CoreError,
    },
    /// Probe reached the service but got no usable value.
    NoData { host: String, error: CoreError },
    /// Source accepted. For REST the service already answered a probe; for
    /// MQTT the broker session is still being opened.
    Connected { transport: Transport, host: String },
    /// A running source gave up after repeated failures.
    DataLost {
        transport: Transport,
        failures: u32,
        error: CoreError,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostRejected { host } => write!(
                f,
                "MQTT connects only to a local broker (127.0.0.1 or localhost); '{host}' was rejected."
            ),
            Self::Cancelled => write!(f, "No address entered. Choose a connection again."),
            Self::TransportFailed {
                transport,
                host,
                error,
            } => write!(
                f,
                "Could not connect to {} at {host}: {error}",
                transport.label()
            ),
            Self::NoData { host, error } => write!(
                f,
                "Connected to the REST API at {host} but got no data ({error}). Please check your configuration."
            ),
            Self::Connected {
                transport: Transport::Rest,
                host,
            } => write!(f, "Connected to REST API at {host}."),
            Self::Connected {
                transport: Transport::Mqtt,
                host,
            } => write!(f, "Using MQTT broker at {host}; waiting for data."),
            Self::DataLost {
                transport,
                failures,
                error,
            } => write!(
                f,
                "{} stopped delivering data after {failures} attempts ({error}). Please choose a connection again.",
                transport.label()
            ),
        }
    }
}

/// Interactive front end driven by the supervisor.
///
/// `None` from a prompt means the user dismissed it.
pub trait Prompter: Send {
    /// Modal MQTT/REST choice. `None` ends the supervisor run.
    fn choose_transport(
        &mut self,
        current: &ConnectionConfig,
    ) -> impl Future<Output = Option<Transport>> + Send;

    /// Host/IP prompt prefilled with `current`. `None` (or a blank answer)
    /// returns to the transport choice.
    fn prompt_host(
        &mut self,
        transport: Transport,
        current: &str,
    ) -> impl Future<Output = Option<String>> + Send;

    fn notify(&mut self, notice: Notice) -> impl Future<Output = ()> + Send;
}
