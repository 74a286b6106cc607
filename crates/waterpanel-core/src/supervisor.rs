// ── Connection supervisor ──
//
// Explicit state loop: choose → (probe) → run the source → on failure, back to
// choose. Exactly one source is alive at a time, and it is always stopped
// before the user is asked anything.

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::{ConnectionConfig, Transport};
use crate::display::DisplaySink;
use crate::error::CoreError;
use crate::model::ConnectionAttemptResult;
use crate::prompt::{Notice, Prompter};
use crate::settings::SettingsStore;
use crate::source::{self, SourceEvent};

// ── SupervisorState ──────────────────────────────────────────────────

/// Where the supervisor is, observable through [`Supervisor::subscribe_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    AwaitingUserChoice,
    /// REST probe in flight.
    ValidatingTransport,
    Active(Transport),
    /// The source gave up; it has been stopped and the user is being told.
    Degraded,
}

/// Result of one pass through the choice dialog.
enum Choice {
    Quit,
    Retry,
    Chosen(ConnectionConfig),
}

/// Why an active source stopped.
enum Ended {
    Shutdown,
    StartFailed(CoreError),
    Degraded { failures: u32, error: CoreError },
}

// ── Supervisor ───────────────────────────────────────────────────────

/// Drives the connection lifecycle.
///
/// Owns the live [`ConnectionConfig`]; the prompter, display and settings
/// store are the outside world it talks to.
pub struct Supervisor<P, D, S> {
    config: ConnectionConfig,
    prompter: P,
    display: D,
    store: S,
    state: watch::Sender<SupervisorState>,
    initial_choice: Option<(Transport, String)>,
}

impl<P, D, S> Supervisor<P, D, S>
where
    P: Prompter,
    D: DisplaySink,
    S: SettingsStore,
{
    pub fn new(config: ConnectionConfig, prompter: P, display: D, store: S) -> Self {
        let (state, _) = watch::channel(SupervisorState::AwaitingUserChoice);
        Self {
            config,
            prompter,
            display,
            store,
            state,
            initial_choice: None,
        }
    }

    /// Answer the first transport/host prompt in advance.
    pub fn with_initial_choice(mut self, transport: Transport, host: impl Into<String>) -> Self {
        self.initial_choice = Some((transport, host.into()));
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    pub fn active_transport(&self) -> Option<Transport> {
        match self.state() {
            SupervisorState::Active(transport) => Some(transport),
            _ => None,
        }
    }

    /// Run until the user dismisses the transport choice or `cancel` fires.
    ///
    /// Every failure loops back to the choice; nothing here ends the run
    /// except those two.
    pub async fn run(&mut self, cancel: CancellationToken) {
        loop {
            self.set_state(SupervisorState::AwaitingUserChoice);

            let choice = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                choice = self.await_choice() => choice,
            };
            let candidate = match choice {
                Choice::Quit => {
                    tracing::info!("Transport choice dismissed, stopping");
                    break;
                }
                Choice::Retry => continue,
                Choice::Chosen(candidate) => candidate,
            };

            let accepted = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                accepted = self.validate(&candidate) => accepted,
            };
            if !accepted {
                continue;
            }
            self.accept(candidate).await;

            match self.run_active(&cancel).await {
                Ended::Shutdown => break,
                Ended::StartFailed(error) => {
                    self.prompter
                        .notify(Notice::TransportFailed {
                            transport: self.config.transport,
                            host: self.config.host.clone(),
                            error,
                        })
                        .await;
                }
                Ended::Degraded { failures, error } => {
                    self.prompter
                        .notify(Notice::DataLost {
                            transport: self.config.transport,
                            failures,
                            error,
                        })
                        .await;
                }
            }
        }
        tracing::debug!("Supervisor stopped");
    }

    // ── States ───────────────────────────────────────────────────────

    async fn await_choice(&mut self) -> Choice {
        let (transport, host) = if let Some(initial) = self.initial_choice.take() {
            initial
        } else {
            let Some(transport) = self.prompter.choose_transport(&self.config).await else {
                return Choice::Quit;
            };
            match self.prompter.prompt_host(transport, &self.config.host).await {
                Some(host) => (transport, host),
                None => {
                    self.prompter.notify(Notice::Cancelled).await;
                    return Choice::Retry;
                }
            }
        };

        match ConnectionConfig::check_host(transport, &host) {
            Ok(()) => Choice::Chosen(self.config.with_choice(transport, &host)),
            Err(CoreError::HostRejected { host }) => {
                tracing::warn!(%host, "Rejected non-local MQTT host");
                self.prompter.notify(Notice::HostRejected { host }).await;
                Choice::Retry
            }
            Err(_) => {
                self.prompter.notify(Notice::Cancelled).await;
                Choice::Retry
            }
        }
    }

    /// REST gets one probe; MQTT is accepted on the host check alone.
    async fn validate(&mut self, candidate: &ConnectionConfig) -> bool {
        if candidate.transport == Transport::Mqtt {
            return true;
        }
        self.set_state(SupervisorState::ValidatingTransport);

        let outcome = match candidate.tag_client() {
            Ok(client) => source::probe(&client, &candidate.display_tag).await,
            Err(error) => ConnectionAttemptResult::FailedTransport(error),
        };
        let host = candidate.host.clone();
        match outcome {
            ConnectionAttemptResult::Succeeded(reading) => {
                tracing::info!(%host, value = reading.value, "REST probe succeeded");
                true
            }
            ConnectionAttemptResult::FailedTransport(error) => {
                tracing::warn!(%host, error = %error, "REST probe failed");
                self.prompter
                    .notify(Notice::TransportFailed {
                        transport: Transport::Rest,
                        host,
                        error,
                    })
                    .await;
                false
            }
            ConnectionAttemptResult::FailedNoData(error) => {
                tracing::warn!(%host, error = %error, "REST probe returned no data");
                self.prompter.notify(Notice::NoData { host, error }).await;
                false
            }
        }
    }

    async fn accept(&mut self, candidate: ConnectionConfig) {
        self.config = candidate;
        if let Err(e) = self.store.save(&self.config) {
            tracing::warn!(error = %e, "Failed to persist connection settings");
        }
        self.prompter
            .notify(Notice::Connected {
                transport: self.config.transport,
                host: self.config.host.clone(),
            })
            .await;
    }

    async fn run_active(&mut self, cancel: &CancellationToken) -> Ended {
        let transport = self.config.transport;
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let mut source = source::for_transport(transport);

        if let Err(error) = source.start(&self.config, events_tx) {
            tracing::warn!(error = %error, "Data source failed to start");
            return Ended::StartFailed(error);
        }
        self.set_state(SupervisorState::Active(transport));

        let ended = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break Ended::Shutdown,
                event = events.recv() => match event {
                    Some(SourceEvent::Reading(reading)) => self.display.show(&reading),
                    Some(SourceEvent::Exhausted { failures, error }) => {
                        break Ended::Degraded { failures, error };
                    }
                    None => {
                        break Ended::Degraded {
                            failures: 0,
                            error: CoreError::Internal("data source ended unexpectedly".into()),
                        };
                    }
                },
            }
        };

        source.stop();
        if matches!(ended, Ended::Degraded { .. }) {
            self.set_state(SupervisorState::Degraded);
        }
        ended
    }

    fn set_state(&self, next: SupervisorState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = ?previous, to = ?next, "Supervisor state");
        }
    }
}
