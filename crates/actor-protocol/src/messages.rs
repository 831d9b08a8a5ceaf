use std::fmt;

use core_types::{DecodeError, TelemetryRecord};
use serde::{Serialize, Serializer};

use crate::errors::ReceiverError;

/// Counters kept by a receiver loop.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ReceiverSummary {
    /// Frames handed out by the framer
    pub frames_read: u64,
    /// Frames that produced a record
    pub records_decoded: u64,
    /// Frames the decoder rejected
    pub frames_skipped: u64,
    /// Bytes dropped while hunting for a sync marker
    pub bytes_discarded: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum StopReason {
    /// `stop()` was requested
    Cancelled,
    /// The loop could not continue
    Failed(#[serde(serialize_with = "serialize_display")] ReceiverError),
}

/// Final state of a receiver loop.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReceiverReport {
    pub reason: StopReason,
    pub summary: ReceiverSummary,
}

/// Events from a receiver loop to its consumer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum ReceiverEvent {
    /// The byte source is open
    Connected { source: String },

    /// A frame decoded successfully
    Record(TelemetryRecord),

    /// A frame was read but could not be decoded; framing continues
    FrameSkipped {
        timestamp_us: u64,
        #[serde(serialize_with = "serialize_display")]
        reason: DecodeError,
    },

    /// Last event before the channel closes. The source is already closed.
    Stopped(ReceiverReport),
}

fn serialize_display<T: fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use core_types::StreamError;

    #[test]
    fn test_record_event_serialization() {
        let event = ReceiverEvent::Record(
            TelemetryRecord::new(500, "beacon-v2").with_field("bus_voltage", 7.9),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["Record"]["fields"]["bus_voltage"], 7.9);
    }

    #[test]
    fn test_skip_event_serializes_reason_text() {
        let event = ReceiverEvent::FrameSkipped {
            timestamp_us: 9,
            reason: DecodeError::Truncated {
                needed: 325,
                actual: 272,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json["FrameSkipped"]["reason"]
            .as_str()
            .unwrap()
            .contains("needs 325 bytes"));
    }

    #[test]
    fn test_stopped_event_serialization() {
        let event = ReceiverEvent::Stopped(ReceiverReport {
            reason: StopReason::Failed(StreamError::Closed.into()),
            summary: ReceiverSummary {
                frames_read: 3,
                ..Default::default()
            },
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["Stopped"]["summary"]["frames_read"], 3);
        assert_eq!(
            json["Stopped"]["reason"]["Failed"],
            "Stream error: Stream closed by peer"
        );
    }
}
