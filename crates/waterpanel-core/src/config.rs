// ── Runtime connection configuration ──
//
// These types describe *how* to reach the panel's data sources. They carry
// credentials and timing, but never touch disk. The config crate builds a
// `ConnectionConfig` and hands it to the supervisor, which owns it.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use waterpanel_api::{MqttSettings, TagClient, TransportConfig};

use crate::error::CoreError;

/// Tags requested on every REST read, in service order.
pub const DEFAULT_TAG_NAMES: [&str; 20] = [
    "Flow_1",
    "Flow_2",
    "Level_1",
    "Level_2",
    "Pressure_1",
    "Pressure_2",
    "Pressure_3",
    "Pressure_4",
    "Temp1_1",
    "Temp1_2",
    "Temp2_1",
    "Temp2_2",
    "Pump1_1",
    "Pump1_2",
    "Pump2_1",
    "Pump2_2",
    "Status1_1",
    "Status1_2",
    "Status2_1",
    "Status2_2",
];

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_MQTT_PORT: u16 = 51328;
pub const DEFAULT_REST_ENDPOINT: &str = "/WaWebService/Json/GetTagValue/express";
pub const DEFAULT_MQTT_TOPIC: &str = "/v1/device/+/rawdata";
pub const DEFAULT_MQTT_LABEL: &str = "currentInjector";
pub const DEFAULT_DISPLAY_TAG: &str = "Flow_1";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_NO_DATA_THRESHOLD: u32 = 3;

const CLIENT_ID_PREFIX: &str = "waterpanel_";

/// Which data source feeds the readout.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Transport {
    /// Subscribe to the broker's raw-data topic.
    #[default]
    Mqtt,
    /// Poll the tag web service.
    Rest,
}

impl Transport {
    /// Label used in prompts and notices.
    pub fn label(self) -> &'static str {
        match self {
            Self::Mqtt => "MQTT",
            Self::Rest => "REST API",
        }
    }
}

/// Everything the supervisor and adapters need to reach a data source.
///
/// Built by the config crate, owned by the supervisor. Adapters only ever
/// receive `&ConnectionConfig`.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub transport: Transport,
    /// Host or IP, optionally with `:port` for REST.
    pub host: String,

    // ── MQTT ─────────────────────────────────────────────────────────
    pub mqtt_port: u16,
    pub mqtt_username: String,
    pub mqtt_password: SecretString,
    /// `wss://` instead of `ws://`.
    pub mqtt_tls: bool,
    pub mqtt_topic: String,
    /// `dataBA` label carrying the displayed value.
    pub mqtt_label: String,
    pub mqtt_reconnect: Duration,
    pub mqtt_connect_timeout: Duration,

    // ── REST ─────────────────────────────────────────────────────────
    pub rest_endpoint: String,
    pub rest_username: String,
    pub rest_password: SecretString,
    /// Tag whose value is displayed.
    pub display_tag: String,
    pub tag_names: Vec<String>,
    pub poll_interval: Duration,
    pub request_timeout: Duration,

    /// Consecutive failed observations before a source is given up.
    pub no_data_threshold: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Mqtt,
            host: DEFAULT_HOST.into(),
            mqtt_port: DEFAULT_MQTT_PORT,
            mqtt_username: "admin".into(),
            mqtt_password: SecretString::from("admin".to_string()),
            mqtt_tls: false,
            mqtt_topic: DEFAULT_MQTT_TOPIC.into(),
            mqtt_label: DEFAULT_MQTT_LABEL.into(),
            mqtt_reconnect: Duration::from_secs(5),
            mqtt_connect_timeout: Duration::from_secs(30),
            rest_endpoint: DEFAULT_REST_ENDPOINT.into(),
            rest_username: "admin".into(),
            rest_password: SecretString::from(String::new()),
            display_tag: DEFAULT_DISPLAY_TAG.into(),
            tag_names: DEFAULT_TAG_NAMES.iter().map(|s| (*s).to_owned()).collect(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            request_timeout: Duration::from_secs(10),
            no_data_threshold: DEFAULT_NO_DATA_THRESHOLD,
        }
    }
}

impl ConnectionConfig {
    /// `true` for the two host spellings the broker is reachable under.
    pub fn is_loopback_host(host: &str) -> bool {
        let host = host.trim();
        host == "127.0.0.1" || host.eq_ignore_ascii_case("localhost")
    }

    /// Check a transport/host pair before anything is opened.
    ///
    /// MQTT only talks to a broker on this machine; REST goes anywhere.
    pub fn check_host(transport: Transport, host: &str) -> Result<(), CoreError> {
        let trimmed = host.trim();
        if trimmed.is_empty() {
            return Err(CoreError::UserCancelled);
        }
        if transport == Transport::Mqtt && !Self::is_loopback_host(trimmed) {
            return Err(CoreError::HostRejected {
                host: trimmed.to_owned(),
            });
        }
        Ok(())
    }

    /// Copy of this config with a user choice applied.
    pub fn with_choice(&self, transport: Transport, host: &str) -> Self {
        Self {
            transport,
            host: host.trim().to_owned(),
            ..self.clone()
        }
    }

    /// Build the REST client for the current host.
    pub fn tag_client(&self) -> Result<TagClient, CoreError> {
        let transport = TransportConfig::default().with_timeout(self.request_timeout);
        Ok(TagClient::new(
            &self.host,
            &self.rest_endpoint,
            self.rest_username.clone(),
            self.rest_password.clone(),
            &self.tag_names,
            &transport,
        )?)
    }

    /// Broker session settings with a fresh client id.
    pub fn mqtt_settings(&self) -> MqttSettings {
        let mut settings = MqttSettings::new(self.host.trim(), self.mqtt_port, new_client_id());
        settings.tls = self.mqtt_tls;
        settings.username.clone_from(&self.mqtt_username);
        settings.password = self.mqtt_password.clone();
        settings.topic.clone_from(&self.mqtt_topic);
        settings.reconnect_delay = self.mqtt_reconnect;
        settings.connect_timeout = self.mqtt_connect_timeout;
        settings
    }
}

/// `waterpanel_` plus six hex digits.
fn new_client_id() -> String {
    let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(6).collect();
    format!("{CLIENT_ID_PREFIX}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_panel_installation() {
        let cfg = ConnectionConfig::default();
        assert_eq!(cfg.transport, Transport::Mqtt);
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.mqtt_port, 51328);
        assert_eq!(cfg.poll_interval, Duration::from_millis(5000));
        assert_eq!(cfg.tag_names.len(), 20);
        assert_eq!(cfg.tag_names[0], "Flow_1");
        assert_eq!(cfg.no_data_threshold, 3);
    }

    #[test]
    fn loopback_hosts() {
        assert!(ConnectionConfig::is_loopback_host("127.0.0.1"));
        assert!(ConnectionConfig::is_loopback_host("localhost"));
        assert!(ConnectionConfig::is_loopback_host(" LocalHost "));
        assert!(!ConnectionConfig::is_loopback_host("192.168.1.20"));
        assert!(!ConnectionConfig::is_loopback_host("127.0.0.2"));
        assert!(!ConnectionConfig::is_loopback_host("localhost.example.com"));
    }

    #[test]
    fn mqtt_rejects_remote_host() {
        let err = ConnectionConfig::check_host(Transport::Mqtt, "10.0.0.5").unwrap_err();
        assert!(matches!(err, CoreError::HostRejected { ref host } if host == "10.0.0.5"));
    }

    #[test]
    fn rest_accepts_any_host() {
        assert!(ConnectionConfig::check_host(Transport::Rest, "10.0.0.5").is_ok());
        assert!(ConnectionConfig::check_host(Transport::Mqtt, "localhost").is_ok());
    }

    #[test]
    fn blank_host_counts_as_cancel() {
        let err = ConnectionConfig::check_host(Transport::Rest, "   ").unwrap_err();
        assert!(matches!(err, CoreError::UserCancelled));
    }

    #[test]
    fn transport_parses_case_insensitively() {
        assert_eq!("MQTT".parse::<Transport>().unwrap(), Transport::Mqtt);
        assert_eq!("rest".parse::<Transport>().unwrap(), Transport::Rest);
        assert_eq!(Transport::Rest.to_string(), "rest");
        assert!("modbus".parse::<Transport>().is_err());
    }

    #[test]
    fn mqtt_settings_carry_config() {
        let cfg = ConnectionConfig::default();
        let settings = cfg.mqtt_settings();
        assert_eq!(settings.broker_url(), "ws://127.0.0.1:51328");
        assert_eq!(settings.username, "admin");
        assert!(settings.client_id.starts_with("waterpanel_"));
        assert_eq!(settings.client_id.len(), "waterpanel_".len() + 6);
    }

    #[test]
    fn with_choice_trims_host() {
        let cfg = ConnectionConfig::default().with_choice(Transport::Rest, " 10.1.1.1 ");
        assert_eq!(cfg.transport, Transport::Rest);
        assert_eq!(cfg.host, "10.1.1.1");
    }
}
