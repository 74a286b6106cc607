//! Configuration for waterpanel.
//!
//! Two files live in the platform config directory: `config.toml`, written by
//! hand, and `state.toml`, written by the app whenever a connection is
//! accepted. Layering, lowest first: built-in defaults, `config.toml`,
//! `WATERPANEL_*` environment variables, `state.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use waterpanel_core::config::{
    DEFAULT_DISPLAY_TAG, DEFAULT_HOST, DEFAULT_MQTT_LABEL, DEFAULT_MQTT_PORT, DEFAULT_MQTT_TOPIC,
    DEFAULT_NO_DATA_THRESHOLD, DEFAULT_POLL_INTERVAL_MS, DEFAULT_REST_ENDPOINT, DEFAULT_TAG_NAMES,
};
use waterpanel_core::{ConnectionConfig, CoreError, SettingsStore, Transport};

const CONFIG_FILE: &str = "config.toml";
const STATE_FILE: &str = "state.toml";
const ENV_PREFIX: &str = "WATERPANEL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to serialize state: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        CoreError::Config {
            message: err.to_string(),
        }
    }
}

// ── config.toml ─────────────────────────────────────────────────────

/// Hand-written settings. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    pub transport: Transport,
    pub host: String,

    pub mqtt_port: u16,
    pub mqtt_username: String,
    pub mqtt_password: String,
    pub mqtt_tls: bool,
    pub mqtt_topic: String,
    pub mqtt_label: String,
    pub mqtt_reconnect_ms: u64,
    pub mqtt_connect_timeout_ms: u64,

    pub rest_endpoint: String,
    pub rest_username: String,
    /// Empty by default; the tag service accepts `admin:` as Basic auth.
    pub rest_password: String,
    pub display_tag: String,
    pub tag_names: Vec<String>,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,

    pub no_data_threshold: u32,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Mqtt,
            host: DEFAULT_HOST.into(),
            mqtt_port: DEFAULT_MQTT_PORT,
            mqtt_username: "admin".into(),
            mqtt_password: "admin".into(),
            mqtt_tls: false,
            mqtt_topic: DEFAULT_MQTT_TOPIC.into(),
            mqtt_label: DEFAULT_MQTT_LABEL.into(),
            mqtt_reconnect_ms: 5_000,
            mqtt_connect_timeout_ms: 30_000,
            rest_endpoint: DEFAULT_REST_ENDPOINT.into(),
            rest_username: "admin".into(),
            rest_password: String::new(),
            display_tag: DEFAULT_DISPLAY_TAG.into(),
            tag_names: DEFAULT_TAG_NAMES.iter().map(|s| (*s).to_owned()).collect(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: 10_000,
            no_data_threshold: DEFAULT_NO_DATA_THRESHOLD,
        }
    }
}

impl FileConfig {
    pub fn into_connection_config(self) -> ConnectionConfig {
        ConnectionConfig {
            transport: self.transport,
            host: self.host,
            mqtt_port: self.mqtt_port,
            mqtt_username: self.mqtt_username,
            mqtt_password: SecretString::from(self.mqtt_password),
            mqtt_tls: self.mqtt_tls,
            mqtt_topic: self.mqtt_topic,
            mqtt_label: self.mqtt_label,
            mqtt_reconnect: Duration::from_millis(self.mqtt_reconnect_ms),
            mqtt_connect_timeout: Duration::from_millis(self.mqtt_connect_timeout_ms),
            rest_endpoint: self.rest_endpoint,
            rest_username: self.rest_username,
            rest_password: SecretString::from(self.rest_password),
            display_tag: self.display_tag,
            tag_names: self.tag_names,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            no_data_threshold: self.no_data_threshold,
        }
    }
}

// ── state.toml ──────────────────────────────────────────────────────

/// The connection fields remembered between runs. MQTT only; REST settings
/// always come from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PersistedState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mqtt_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mqtt_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mqtt_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mqtt_password: Option<String>,
}

impl PersistedState {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            mqtt_ip_address: Some(config.host.clone()),
            mqtt_port: Some(config.mqtt_port),
            mqtt_username: Some(config.mqtt_username.clone()),
            mqtt_password: Some(config.mqtt_password.expose_secret().to_owned()),
        }
    }

    /// Lenient parse: each field is read on its own, so one bad value does
    /// not discard the others.
    pub fn parse(text: &str) -> Self {
        let table: toml::Table = match text.parse() {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable state file");
                return Self::default();
            }
        };

        let text_field = |key: &str| {
            table
                .get(key)
                .and_then(toml::Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        Self {
            mqtt_ip_address: text_field("mqtt_ip_address"),
            mqtt_port: table
                .get("mqtt_port")
                .and_then(toml::Value::as_integer)
                .and_then(|port| u16::try_from(port).ok())
                .filter(|port| *port != 0),
            mqtt_username: text_field("mqtt_username"),
            // An empty password is a valid password.
            mqtt_password: table
                .get("mqtt_password")
                .and_then(toml::Value::as_str)
                .map(str::to_owned),
        }
    }

    pub fn apply(self, config: &mut ConnectionConfig) {
        if let Some(host) = self.mqtt_ip_address {
            config.host = host;
        }
        if let Some(port) = self.mqtt_port {
            config.mqtt_port = port;
        }
        if let Some(username) = self.mqtt_username {
            config.mqtt_username = username;
        }
        if let Some(password) = self.mqtt_password {
            config.mqtt_password = SecretString::from(password);
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    ProjectDirs::from("com", "waterpanel", "waterpanel").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("waterpanel");
            p
        },
        |dirs| dirs.config_dir().to_path_buf(),
    )
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// Where accepted connection settings are persisted.
pub fn state_path() -> PathBuf {
    config_dir().join(STATE_FILE)
}

// ── Loading ─────────────────────────────────────────────────────────

/// Strict load of defaults + `config.toml` + environment.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX));

    Ok(figment.extract()?)
}

// ── ConfigStore ─────────────────────────────────────────────────────

/// Owns the paths of the two config files.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
    state_path: PathBuf,
}

impl ConfigStore {
    /// Store rooted in the platform config directory.
    pub fn open() -> Self {
        Self::at(config_path(), state_path())
    }

    pub fn at(config_path: impl Into<PathBuf>, state_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            state_path: state_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Build the effective configuration. Never fails: a broken config file
    /// is logged and replaced by defaults, a broken state value by the
    /// layer beneath it.
    pub fn load(&self) -> ConnectionConfig {
        let file = load_file_config(&self.config_path).unwrap_or_else(|e| {
            tracing::warn!(path = %self.config_path.display(), error = %e, "Ignoring config file");
            FileConfig::default()
        });
        let mut config = file.into_connection_config();

        match std::fs::read_to_string(&self.state_path) {
            Ok(text) => PersistedState::parse(&text).apply(&mut config),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.state_path.display(), error = %e, "Cannot read state file");
            }
        }

        tracing::debug!(
            transport = %config.transport,
            host = %config.host,
            mqtt_port = config.mqtt_port,
            "Configuration loaded"
        );
        config
    }

    /// Persist the MQTT fields of `config`.
    pub fn save(&mut self, config: &ConnectionConfig) -> Result<(), ConfigError> {
        let state = PersistedState::from_config(config);
        let text = toml::to_string_pretty(&state)?;

        if let Some(parent) = self.state_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.state_path, text).map_err(|source| ConfigError::Io {
            path: self.state_path.clone(),
            source,
        })?;

        tracing::info!(path = %self.state_path.display(), host = %config.host, "Connection settings saved");
        Ok(())
    }

    /// Forget persisted state. Returns whether a file was removed.
    pub fn reset(&mut self) -> Result<bool, ConfigError> {
        match std::fs::remove_file(&self.state_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ConfigError::Io {
                path: self.state_path.clone(),
                source,
            }),
        }
    }
}

impl SettingsStore for ConfigStore {
    fn save(&mut self, config: &ConnectionConfig) -> Result<(), CoreError> {
        ConfigStore::save(self, config).map_err(CoreError::from)
    }
}
