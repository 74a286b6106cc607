//! Command handlers.

pub mod config_cmd;
pub mod probe;
pub mod watch;

use waterpanel_config::ConfigStore;
use waterpanel_core::Transport;

use crate::cli::{GlobalOpts, TransportArg};

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Mqtt => Transport::Mqtt,
            TransportArg::Rest => Transport::Rest,
        }
    }
}

/// Config store for `--config`, or the platform default location.
pub fn open_store(global: &GlobalOpts) -> ConfigStore {
    match &global.config {
        Some(path) => ConfigStore::at(path, path.with_file_name("state.toml")),
        None => ConfigStore::open(),
    }
}
