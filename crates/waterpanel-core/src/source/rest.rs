// ── REST poller ──
//
// Immediate fetch, then one fetch per tick. Each fetch is awaited before the
// next tick is taken, so responses arrive in request order.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use waterpanel_api::{TagClient, TagValuesResponse};

use super::{DataSource, Generation, GuardedSender, RunHandle, SourceEvent};
use crate::config::{ConnectionConfig, Transport};
use crate::error::CoreError;
use crate::model::{ConnectionAttemptResult, Reading};
use crate::retry::RetryState;

/// Periodic tag reader. At most one poll task per poller.
#[derive(Default)]
pub struct RestPoller {
    generation: Generation,
    run: Option<RunHandle>,
}

impl RestPoller {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataSource for RestPoller {
    fn transport(&self) -> Transport {
        Transport::Rest
    }

    fn start(
        &mut self,
        config: &ConnectionConfig,
        events: mpsc::UnboundedSender<SourceEvent>,
    ) -> Result<(), CoreError> {
        self.stop();

        let client = config.tag_client()?;
        let run = self.generation.advance();
        let cancel = CancellationToken::new();
        let plan = PollPlan {
            tag: config.display_tag.clone(),
            interval: config.poll_interval.max(Duration::from_millis(1)),
            threshold: config.no_data_threshold,
        };

        tracing::info!(
            url = %client.url(),
            tag = %plan.tag,
            interval_ms = u64::try_from(plan.interval.as_millis()).unwrap_or(u64::MAX),
            "Starting REST poller"
        );

        let sender = GuardedSender::new(events, self.generation.clone(), run);
        let task = tokio::spawn(poll_loop(client, plan, sender, cancel.clone()));
        self.run = Some(RunHandle::new(cancel, task));
        Ok(())
    }

    fn stop(&mut self) {
        self.generation.advance();
        if let Some(run) = self.run.take() {
            tracing::debug!("Stopping REST poller");
            run.cancel();
        }
    }

    fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(RunHandle::is_running)
    }
}

impl Drop for RestPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

struct PollPlan {
    tag: String,
    interval: Duration,
    threshold: u32,
}

async fn poll_loop(
    client: TagClient,
    plan: PollPlan,
    sender: GuardedSender,
    cancel: CancellationToken,
) {
    let mut retry = RetryState::new(plan.threshold);
    let mut ticker = tokio::time::interval(plan.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // First tick completes immediately.
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let observed = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            observed = fetch(&client, &plan.tag) => observed,
        };

        if !sender.is_live() {
            break;
        }

        match observed {
            Ok(reading) => {
                retry.record_success();
                tracing::debug!(tag = %reading.tag, value = reading.value, "REST reading");
                if !sender.send(SourceEvent::Reading(reading)) {
                    break;
                }
            }
            Err(error) => {
                let exhausted = retry.record_failure();
                tracing::warn!(
                    error = %error,
                    failures = retry.consecutive(),
                    threshold = retry.threshold(),
                    "REST poll produced no data"
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

    tracing::debug!("REST poll loop exiting");
}

async fn fetch(client: &TagClient, tag: &str) -> Result<Reading, CoreError> {
    let response = client.read_tags().await?;
    observe_tag(&response, tag)
}

/// Pick `tag` out of a read response and validate it.
///
/// Absent tags, non-numeric values and the sentinel are all errors; every
/// other entry in the batch is ignored.
pub fn observe_tag(response: &TagValuesResponse, tag: &str) -> Result<Reading, CoreError> {
    let entry = response.find(tag).ok_or_else(|| CoreError::MissingTag {
        tag: tag.to_owned(),
    })?;
    let value = entry.as_f64().ok_or_else(|| CoreError::MalformedPayload {
        message: format!("{tag} value {} is not numeric", entry.value),
    })?;
    Reading::new(tag, value, Transport::Rest)
}

/// One validation fetch, classified.
pub async fn probe(client: &TagClient, tag: &str) -> ConnectionAttemptResult {
    tracing::info!(url = %client.url(), tag, "Probing REST service");
    ConnectionAttemptResult::classify(fetch(client, tag).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> TagValuesResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn picks_display_tag_from_batch() {
        let resp = response(
            r#"{"Values":[{"Name":"Level_1","Value":3},{"Name":"Flow_1","Value":42.5}]}"#,
        );
        let reading = observe_tag(&resp, "Flow_1").unwrap();
        assert_eq!(reading.formatted(), "42.50");
        assert_eq!(reading.transport, Transport::Rest);
    }

    #[test]
    fn sentinel_is_no_data() {
        let resp = response(r#"{"Values":[{"Name":"Flow_1","Value":-105}]}"#);
        let err = observe_tag(&resp, "Flow_1").unwrap_err();
        assert!(matches!(err, CoreError::NoDataSentinel { .. }));
    }

    #[test]
    fn absent_tag_is_missing() {
        let resp = response(r#"{"Values":[{"Name":"Flow_2","Value":1}]}"#);
        let err = observe_tag(&resp, "Flow_1").unwrap_err();
        assert!(matches!(err, CoreError::MissingTag { ref tag } if tag == "Flow_1"));
    }

    #[test]
    fn string_value_is_malformed() {
        let resp = response(r#"{"Values":[{"Name":"Flow_1","Value":"on"}]}"#);
        let err = observe_tag(&resp, "Flow_1").unwrap_err();
        assert!(matches!(err, CoreError::MalformedPayload { .. }));
        assert!(err.is_no_data());
    }

    #[test]
    fn stop_without_start_is_harmless() {
        let mut poller = RestPoller::new();
        poller.stop();
        poller.stop();
        assert!(!poller.is_running());
    }
}
