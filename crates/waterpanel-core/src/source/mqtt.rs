// ── MQTT subscriber ──
//
// Wraps an `MqttHandle` and turns broker traffic into readings. Payloads that
// cannot be read are dropped; only connection failures count toward giving up.

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use waterpanel_api::{MqttEvent, MqttHandle, RawDataMessage};

use super::{DataSource, Generation, GuardedSender, RunHandle, SourceEvent};
use crate::config::{ConnectionConfig, Transport};
use crate::error::CoreError;
use crate::model::Reading;
use crate::retry::RetryState;

/// Broker subscription feeding one `dataBA` label to the display.
#[derive(Default)]
pub struct MqttSubscriber {
    generation: Generation,
    run: Option<RunHandle>,
}

impl MqttSubscriber {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataSource for MqttSubscriber {
    fn transport(&self) -> Transport {
        Transport::Mqtt
    }

    fn start(
        &mut self,
        config: &ConnectionConfig,
        events: mpsc::UnboundedSender<SourceEvent>,
    ) -> Result<(), CoreError> {
        self.stop();

        let cancel = CancellationToken::new();
        let handle = MqttHandle::connect(config.mqtt_settings(), cancel.clone())?;
        let run = self.generation.advance();
        let sender = GuardedSender::new(events, self.generation.clone(), run);

        let task = tokio::spawn(subscribe_loop(
            handle,
            config.mqtt_label.clone(),
            RetryState::new(config.no_data_threshold),
            sender,
            cancel.clone(),
        ));
        self.run = Some(RunHandle::new(cancel, task));
        Ok(())
    }

    fn stop(&mut self) {
        self.generation.advance();
        if let Some(run) = self.run.take() {
            tracing::debug!("Stopping MQTT subscriber");
            run.cancel();
        }
    }

    fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(RunHandle::is_running)
    }
}

impl Drop for MqttSubscriber {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Stream of broker session events consumed by the subscribe loop.
pub(crate) trait MqttEvents: Send {
    /// `None` once the session has ended.
    fn next_event(&mut self) -> impl Future<Output = Option<MqttEvent>> + Send;

    fn close(&mut self);
}

impl MqttEvents for MqttHandle {
    async fn next_event(&mut self) -> Option<MqttEvent> {
        MqttHandle::next_event(self).await
    }

    fn close(&mut self) {
        self.shutdown();
    }
}

async fn subscribe_loop<E: MqttEvents>(
    mut session: E,
    label: String,
    mut retry: RetryState,
    sender: GuardedSender,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = session.next_event() => event,
        };
        let Some(event) = event else {
            break;
        };
        if !sender.is_live() {
            break;
        }

        match event {
            MqttEvent::Connected => retry.record_success(),
            MqttEvent::Message { topic, payload } => {
                match reading_from_payload(&payload, &label) {
                    Ok(Some(reading)) => {
                        retry.record_success();
                        tracing::debug!(%topic, value = reading.value, "MQTT reading");
                        if !sender.send(SourceEvent::Reading(reading)) {
                            break;
                        }
                    }
                    Ok(None) => tracing::trace!(%topic, %label, "label not in payload"),
                    Err(e) => tracing::warn!(%topic, error = %e, "Dropping MQTT payload"),
                }
            }
            MqttEvent::ConnectionLost(e) => {
                let error = CoreError::from(e);
                let exhausted = retry.record_failure();
                tracing::warn!(
                    error = %error,
                    failures = retry.consecutive(),
                    threshold = retry.threshold(),
                    "MQTT connection failed"
                );
                if exhausted {
                    sender.send(SourceEvent::Exhausted {
                        failures: retry.consecutive(),
                        error,
                    });
                    break;
                }
            }
        }
    }

    session.close();
    tracing::debug!("MQTT subscribe loop exiting");
}

/// Read the `label` entry of a raw-data payload.
///
/// `Ok(None)` when the label is absent or carries no value. Unparsable JSON,
/// non-numeric values and the sentinel are errors.
pub fn reading_from_payload(payload: &[u8], label: &str) -> Result<Option<Reading>, CoreError> {
    let message: RawDataMessage =
        serde_json::from_slice(payload).map_err(|e| CoreError::MalformedPayload {
            message: e.to_string(),
        })?;

    let Some(point) = message.find(label) else {
        return Ok(None);
    };
    if point.value.is_null() {
        return Ok(None);
    }
    let value = point.as_f64().ok_or_else(|| CoreError::MalformedPayload {
        message: format!("{label} value {} is not numeric", point.value),
    })?;
    Reading::new(label, value, Transport::Mqtt).map(Some)
}
