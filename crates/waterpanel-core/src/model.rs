// ── Domain values ──
//
// A `Reading` is a value that passed validation and may be shown.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Transport;
use crate::error::CoreError;

/// Marker the control system reports for a tag without data.
pub const NO_DATA_SENTINEL: f64 = -105.0;

/// `true` when `value` is the no-data marker.
#[allow(clippy::float_cmp)]
pub fn is_no_data(value: f64) -> bool {
    value == NO_DATA_SENTINEL
}

/// A validated value ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Tag name (REST) or `dataBA` label (MQTT).
    pub tag: String,
    pub value: f64,
    pub transport: Transport,
    pub received_at: DateTime<Utc>,
}

impl Reading {
    /// Validate a raw value. Non-finite values and the sentinel are refused.
    pub fn new(tag: impl Into<String>, value: f64, transport: Transport) -> Result<Self, CoreError> {
        let tag = tag.into();
        if is_no_data(value) {
            return Err(CoreError::NoDataSentinel { tag });
        }
        if !value.is_finite() {
            return Err(CoreError::MalformedPayload {
                message: format!("{tag} is not a finite number"),
            });
        }
        Ok(Self {
            tag,
            value,
            transport,
            received_at: Utc::now(),
        })
    }

    /// The value with exactly two decimal places. Halfway cases round away
    /// from zero, so 42.125 shows as 42.13.
    pub fn formatted(&self) -> String {
        let rounded = (self.value * 100.0).round() / 100.0;
        format!("{rounded:.2}")
    }
}

/// Outcome of a validation probe.
#[derive(Debug, Clone)]
pub enum ConnectionAttemptResult {
    /// The source answered with a usable value.
    Succeeded(Reading),
    /// Network or HTTP failure.
    FailedTransport(CoreError),
    /// Reachable, but the value was the sentinel, missing, or unreadable.
    FailedNoData(CoreError),
}

impl ConnectionAttemptResult {
    /// Classify a single observation.
    pub fn classify(observed: Result<Reading, CoreError>) -> Self {
        match observed {
            Ok(reading) => Self::Succeeded(reading),
            Err(e) if e.is_no_data() => Self::FailedNoData(e),
            Err(e) => Self::FailedTransport(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_two_decimals() {
        let r = Reading::new("Flow_1", 42.5, Transport::Rest).unwrap();
        assert_eq!(r.formatted(), "42.50");
        let r = Reading::new("currentInjector", 7.1, Transport::Mqtt).unwrap();
        assert_eq!(r.formatted(), "7.10");
        let r = Reading::new("Flow_1", 12.3456, Transport::Rest).unwrap();
        assert_eq!(r.formatted(), "12.35");
        let r = Reading::new("Flow_1", 0.0, Transport::Rest).unwrap();
        assert_eq!(r.formatted(), "0.00");
        let r = Reading::new("Flow_1", -12.0, Transport::Rest).unwrap();
        assert_eq!(r.formatted(), "-12.00");
    }

    #[test]
    fn halfway_values_round_away_from_zero() {
        for (value, shown) in [
            (0.125, "0.13"),
            (42.125, "42.13"),
            (2.625, "2.63"),
            (-0.125, "-0.13"),
            // Just below the halfway point in binary.
            (1.005, "1.00"),
        ] {
            let r = Reading::new("Flow_1", value, Transport::Rest).unwrap();
            assert_eq!(r.formatted(), shown, "{value}");
        }
    }

    #[test]
    fn sentinel_is_refused() {
        let err = Reading::new("Flow_1", -105.0, Transport::Rest).unwrap_err();
        assert!(matches!(err, CoreError::NoDataSentinel { ref tag } if tag == "Flow_1"));
    }

    #[test]
    fn near_sentinel_is_a_real_value() {
        assert!(Reading::new("Flow_1", -105.01, Transport::Rest).is_ok());
    }

    #[test]
    fn nan_is_malformed() {
        let err = Reading::new("Flow_1", f64::NAN, Transport::Rest).unwrap_err();
        assert!(matches!(err, CoreError::MalformedPayload { .. }));
    }

    #[test]
    fn classify_splits_transport_from_no_data() {
        let ok = ConnectionAttemptResult::classify(Reading::new("Flow_1", 1.0, Transport::Rest));
        assert!(ok.is_success());

        let no_data = ConnectionAttemptResult::classify(Err(CoreError::MissingTag {
            tag: "Flow_1".into(),
        }));
        assert!(matches!(no_data, ConnectionAttemptResult::FailedNoData(_)));

        let transport = ConnectionAttemptResult::classify(Err(CoreError::TransportUnreachable {
            target: "x".into(),
            reason: "refused".into(),
        }));
        assert!(matches!(transport, ConnectionAttemptResult::FailedTransport(_)));
    }
}
