// waterpanel-core: Connection supervisor and data-source adapters between
// waterpanel-api and consumers (CLI, display front ends).

pub mod config;
pub mod display;
pub mod error;
pub mod model;
pub mod prompt;
pub mod retry;
pub mod settings;
pub mod source;
pub mod supervisor;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ConnectionConfig, Transport};
pub use display::DisplaySink;
pub use error::CoreError;
pub use model::{ConnectionAttemptResult, NO_DATA_SENTINEL, Reading};
pub use prompt::{Notice, Prompter};
pub use retry::RetryState;
pub use settings::SettingsStore;
pub use source::{DataSource, MqttSubscriber, RestPoller, SourceEvent};
pub use supervisor::{Supervisor, SupervisorState};
