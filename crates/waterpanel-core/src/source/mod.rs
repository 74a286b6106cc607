// ── Data source adapters ──
//
// One adapter per transport. Each owns at most one background task; events
// flow to the supervisor over an unbounded channel, tagged with the task's
// generation so nothing from a stopped run gets through.

mod mqtt;
mod rest;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{ConnectionConfig, Transport};
use crate::error::CoreError;
use crate::model::Reading;

pub use mqtt::{MqttSubscriber, reading_from_payload};
pub use rest::{RestPoller, observe_tag, probe};

/// What a running source reports.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A validated value for the display.
    Reading(Reading),
    /// Failure threshold reached; the source has stopped itself.
    Exhausted { failures: u32, error: CoreError },
}

/// A startable, stoppable producer of readings.
pub trait DataSource: Send {
    fn transport(&self) -> Transport;

    /// Start producing into `events`. A running source is torn down first.
    fn start(
        &mut self,
        config: &ConnectionConfig,
        events: mpsc::UnboundedSender<SourceEvent>,
    ) -> Result<(), CoreError>;

    /// Stop producing. Safe to call any number of times.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// Fresh, stopped adapter for `transport`.
pub fn for_transport(transport: Transport) -> Box<dyn DataSource> {
    match transport {
        Transport::Mqtt => Box::new(MqttSubscriber::new()),
        Transport::Rest => Box::new(RestPoller::new()),
    }
}

// ── Generation guard ─────────────────────────────────────────────────

/// Monotonic run counter shared between an adapter and its tasks.
#[derive(Debug, Clone, Default)]
pub(crate) struct Generation(Arc<AtomicU64>);

impl Generation {
    /// Invalidate every outstanding run and return the new current value.
    pub(crate) fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_current(&self, run: u64) -> bool {
        self.0.load(Ordering::SeqCst) == run
    }
}

/// Event sender that goes silent once its run is no longer current.
pub(crate) struct GuardedSender {
    tx: mpsc::UnboundedSender<SourceEvent>,
    generation: Generation,
    run: u64,
}

impl GuardedSender {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<SourceEvent>,
        generation: Generation,
        run: u64,
    ) -> Self {
        Self { tx, generation, run }
    }

    pub(crate) fn is_live(&self) -> bool {
        self.generation.is_current(self.run) && !self.tx.is_closed()
    }

    /// Returns `false` if the event was discarded.
    pub(crate) fn send(&self, event: SourceEvent) -> bool {
        if !self.generation.is_current(self.run) {
            tracing::debug!(run = self.run, "dropping event from stale source run");
            return false;
        }
        self.tx.send(event).is_ok()
    }
}

// ── Run handle ───────────────────────────────────────────────────────

/// The background task of one run plus its cancellation token.
pub(crate) struct RunHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RunHandle {
    pub(crate) fn new(cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { cancel, task }
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }

    pub(crate) fn cancel(self) {
        self.cancel.cancel();
    }
}
