//! MQTT-over-WebSocket session with fixed-period reconnect.
//!
//! Connects to the panel's broker, subscribes to the raw-data topic on every
//! (re)connect, and streams session events through a bounded
//! [`tokio::sync::mpsc`] channel. Reconnection happens automatically after a
//! fixed delay until the session is shut down.
//!
//! # Example
//!
//! ```rust,ignore
//! use waterpanel_api::mqtt::{MqttEvent, MqttHandle, MqttSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut handle = MqttHandle::connect(settings, CancellationToken::new())?;
//! while let Some(event) = handle.next_event().await {
//!     if let MqttEvent::Message { topic, payload } = event {
//!         println!("{topic}: {} bytes", payload.len());
//!     }
//! }
//! handle.shutdown();
//! ```

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, Transport};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── Channel capacities ───────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 256;
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// How long a shutdown waits for DISCONNECT to reach the broker.
const DISCONNECT_GRACE: Duration = Duration::from_millis(500);

// ── MqttSettings ─────────────────────────────────────────────────────

/// Everything needed to open one broker session.
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    /// `wss://` instead of `ws://`.
    pub tls: bool,
    pub username: String,
    pub password: SecretString,
    pub client_id: String,
    /// Topic filter, wildcards allowed (`/v1/device/+/rawdata`).
    pub topic: String,
    pub keep_alive: Duration,
    /// Fixed wait between a lost connection and the next attempt. Default: 5s.
    pub reconnect_delay: Duration,
    /// Upper bound on a single connect attempt. Default: 30s.
    pub connect_timeout: Duration,
}

impl MqttSettings {
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            tls: false,
            username: String::new(),
            password: SecretString::from(String::new()),
            client_id: client_id.into(),
            topic: "/v1/device/+/rawdata".into(),
            keep_alive: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// `ws://{host}:{port}` or `wss://{host}:{port}`.
    pub fn broker_url(&self) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!("{scheme}://{}:{}", self.host.trim(), self.port)
    }

    fn options(&self) -> Result<MqttOptions, Error> {
        let url = self.broker_url();
        Url::parse(&url)?;

        let mut options = MqttOptions::new(self.client_id.clone(), url, self.port);
        if !self.username.is_empty() {
            options.set_credentials(self.username.clone(), self.password.expose_secret());
        }
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        options.set_transport(if self.tls {
            Transport::wss_with_default_config()
        } else {
            Transport::Ws
        });
        Ok(options)
    }
}

// ── MqttEvent ────────────────────────────────────────────────────────

/// Session-level happenings, in arrival order.
#[derive(Debug)]
pub enum MqttEvent {
    /// Broker accepted the connection; the topic subscription was queued.
    Connected,
    /// A publish arrived on a matching topic.
    Message { topic: String, payload: Vec<u8> },
    /// The connection attempt failed or the live connection dropped. A
    /// reconnect follows after the configured delay.
    ConnectionLost(Error),
}

// ── MqttHandle ───────────────────────────────────────────────────────

/// Handle to a running broker session.
///
/// Owns the receiving end of the event channel. Call
/// [`shutdown`](Self::shutdown) (or drop the handle) to tear down the
/// background task.
pub struct MqttHandle {
    event_rx: mpsc::Receiver<MqttEvent>,
    cancel: CancellationToken,
}

impl MqttHandle {
    /// Build the session and spawn its event loop.
    ///
    /// Returns immediately once the background task is spawned. The first
    /// connection attempt happens asynchronously.
    pub fn connect(settings: MqttSettings, cancel: CancellationToken) -> Result<Self, Error> {
        let options = settings.options()?;
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(
            url = %settings.broker_url(),
            client_id = %settings.client_id,
            "Starting MQTT session"
        );

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            mqtt_loop(eventloop, client, settings, event_tx, task_cancel).await;
        });

        Ok(Self { event_rx, cancel })
    }

    /// Wait for the next session event. `None` once the session has ended.
    pub async fn next_event(&mut self) -> Option<MqttEvent> {
        self.event_rx.recv().await
    }

    /// Signal the background task to disconnect and exit. Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for MqttHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background session loop ──────────────────────────────────────────

/// Main loop: poll → forward → on error, fixed delay → poll again.
///
/// Polling the rumqttc event loop after an error is what reconnects it.
async fn mqtt_loop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    settings: MqttSettings,
    event_tx: mpsc::Sender<MqttEvent>,
    cancel: CancellationToken,
) {
    let mut connected = false;

    loop {
        let polled = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            polled = poll_once(&mut eventloop, connected, settings.connect_timeout) => polled,
        };

        let event = match polled {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                tracing::info!(code = ?ack.code, "MQTT connected");
                connected = true;
                if let Err(e) = client.try_subscribe(settings.topic.as_str(), QoS::AtMostOnce) {
                    tracing::warn!(error = %e, topic = %settings.topic, "MQTT subscribe failed");
                }
                Some(MqttEvent::Connected)
            }
            Ok(Event::Incoming(Packet::SubAck(_))) => {
                tracing::debug!(topic = %settings.topic, "MQTT subscription acknowledged");
                None
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => Some(MqttEvent::Message {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            }),
            Ok(_) => None,
            Err(e) => {
                connected = false;
                tracing::warn!(error = %e, "MQTT connection error");
                Some(MqttEvent::ConnectionLost(e))
            }
        };

        let lost = matches!(event, Some(MqttEvent::ConnectionLost(_)));

        if let Some(event) = event {
            // Receiver gone means nobody is listening anymore.
            if event_tx.send(event).await.is_err() {
                break;
            }
        }

        if lost {
            tracing::info!(
                delay_ms = u64::try_from(settings.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
                "Waiting before MQTT reconnect"
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(settings.reconnect_delay) => {}
            }
        }
    }

    if connected {
        close_session(&mut eventloop, &client, DISCONNECT_GRACE).await;
    }
    tracing::debug!("MQTT loop exiting");
}

/// Queue DISCONNECT and poll until it has been written, the connection
/// fails, or `grace` runs out. Returns whether the packet went out.
async fn close_session(eventloop: &mut EventLoop, client: &AsyncClient, grace: Duration) -> bool {
    if let Err(e) = client.try_disconnect() {
        tracing::debug!(error = %e, "MQTT disconnect not queued");
        return false;
    }

    let flushed = tokio::time::timeout(grace, async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => return true,
                Ok(_) => {}
                Err(_) => return false,
            }
        }
    })
    .await;

    match flushed {
        Ok(sent) => sent,
        Err(_) => {
            tracing::debug!(
                grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                "MQTT disconnect not flushed"
            );
            false
        }
    }
}

/// Poll the event loop once. Connect attempts are bounded by
/// `connect_timeout`; an established session is polled without a bound
/// (keep-alive detects dead peers).
async fn poll_once(
    eventloop: &mut EventLoop,
    connected: bool,
    connect_timeout: Duration,
) -> Result<Event, Error> {
    if connected {
        return eventloop
            .poll()
            .await
            .map_err(|e| Error::MqttConnect(e.to_string()));
    }

    match tokio::time::timeout(connect_timeout, eventloop.poll()).await {
        Ok(polled) => polled.map_err(|e| Error::MqttConnect(e.to_string())),
        Err(_) => Err(Error::Timeout {
            timeout_secs: connect_timeout.as_secs(),
        }),
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(host: &str, port: u16) -> MqttSettings {
        let mut s = MqttSettings::new(host, port, "waterpanel_test01");
        s.username = "admin".into();
        s.password = SecretString::from("admin".to_string());
        s.reconnect_delay = Duration::from_millis(50);
        s.connect_timeout = Duration::from_secs(2);
        s
    }

    #[test]
    fn default_settings_match_panel_broker() {
        let s = MqttSettings::new("127.0.0.1", 51328, "id");
        assert_eq!(s.topic, "/v1/device/+/rawdata");
        assert_eq!(s.reconnect_delay, Duration::from_secs(5));
        assert_eq!(s.connect_timeout, Duration::from_secs(30));
        assert!(!s.tls);
    }

    #[test]
    fn broker_url_uses_ws_scheme() {
        assert_eq!(settings("127.0.0.1", 51328).broker_url(), "ws://127.0.0.1:51328");
    }

    #[test]
    fn broker_url_uses_wss_scheme_with_tls() {
        let mut s = settings("localhost", 8884);
        s.tls = true;
        assert_eq!(s.broker_url(), "wss://localhost:8884");
    }

    #[test]
    fn options_reject_unparsable_host() {
        assert!(settings("not a host", 1883).options().is_err());
    }

    #[tokio::test]
    async fn close_session_gives_up_on_a_silent_peer() {
        // Accepts TCP but never answers the WebSocket handshake.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _peer = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let options = settings("127.0.0.1", port).options().unwrap();
        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        let grace = Duration::from_millis(200);
        let started = std::time::Instant::now();
        let sent = close_session(&mut eventloop, &client, grace).await;

        assert!(!sent);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn close_session_stops_on_connection_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let options = settings("127.0.0.1", port).options().unwrap();
        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        let sent = close_session(&mut eventloop, &client, Duration::from_secs(5)).await;
        assert!(!sent);
    }

    #[tokio::test]
    async fn refused_connection_reports_connection_lost() {
        // Grab a free port, then release it so the connect is refused.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let cancel = CancellationToken::new();
        let mut handle = MqttHandle::connect(settings("127.0.0.1", port), cancel.clone()).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), handle.next_event())
            .await
            .unwrap();
        assert!(matches!(event, Some(MqttEvent::ConnectionLost(_))));

        handle.shutdown();
        handle.shutdown();
        assert!(handle.is_shut_down());
        assert!(cancel.is_cancelled());
    }
}
