//! `waterpanel watch`: the interactive live readout.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use waterpanel_core::Supervisor;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output::{self, TerminalDisplay};
use crate::prompt::TerminalPrompter;

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = super::open_store(global);
    let mut config = store.load();
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval = Duration::from_millis(ms);
    }

    let color = output::should_color(global.color);
    let mut supervisor = Supervisor::new(
        config,
        TerminalPrompter::new(color),
        TerminalDisplay::new(global.output, color),
        store,
    );
    if let (Some(transport), Some(host)) = (args.transport, args.host) {
        supervisor = supervisor.with_initial_choice(transport.into(), host);
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            on_signal.cancel();
        }
    });

    supervisor.run(cancel).await;
    Ok(())
}
