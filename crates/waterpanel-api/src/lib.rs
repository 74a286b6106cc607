// waterpanel-api: Async wire clients for the panel's two data sources
// (REST tag reads + MQTT over WebSocket).

pub mod error;
pub mod models;
pub mod mqtt;
pub mod rest;
pub mod transport;

pub use error::Error;
pub use models::{RawDataMessage, RawDataPoint, TagReadRequest, TagValue, TagValuesResponse};
pub use mqtt::{MqttEvent, MqttHandle, MqttSettings};
pub use rest::TagClient;
pub use transport::TransportConfig;
