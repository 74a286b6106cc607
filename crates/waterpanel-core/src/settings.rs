use crate::config::ConnectionConfig;
use crate::error::CoreError;

/// Where an accepted configuration is remembered between runs.
///
/// Implementations persist the MQTT subset only (host, port, username,
/// password). Core never touches disk itself.
pub trait SettingsStore: Send {
    fn save(&mut self, config: &ConnectionConfig) -> Result<(), CoreError>;
}
