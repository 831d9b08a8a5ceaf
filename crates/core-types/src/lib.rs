#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

use serde::{Serialize, Serializer};
use std::borrow::Cow;
use thiserror::Error;

pub mod logging;
pub mod transport;
pub use logging::{LogCrateSink, LogSink, MemorySink, NullSink, SharedSink};
pub use transport::{ByteSource, StreamError};

/// Bytes of one telemetry packet, starting at the sync marker.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RawFrame {
    /// Frame bytes; offset 0 is the first byte of the sync marker.
    pub bytes: Vec<u8>,
    /// Arrival time of the chunk that carried the marker, in microseconds
    /// since the framer was created.
    pub timestamp_us: u64,
}

impl RawFrame {
    pub fn new(bytes: Vec<u8>, timestamp_us: u64) -> Self {
        Self {
            bytes,
            timestamp_us,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Same frame with its payload replaced (e.g. after link-layer unescape).
    pub fn map_bytes(self, f: impl FnOnce(Vec<u8>) -> Vec<u8>) -> Self {
        Self {
            bytes: f(self.bytes),
            timestamp_us: self.timestamp_us,
        }
    }
}

/// Named, scaled values decoded from one frame.
///
/// Field order follows the field table of the revision that produced it.
/// There are no mutating accessors: once a decoder hands a record out it is
/// never changed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TelemetryRecord {
    timestamp_us: u64,
    revision: Cow<'static, str>,
    #[serde(serialize_with = "serialize_fields")]
    fields: Vec<(Cow<'static, str>, f64)>,
}

impl TelemetryRecord {
    pub fn new(timestamp_us: u64, revision: impl Into<Cow<'static, str>>) -> Self {
        Self {
            timestamp_us,
            revision: revision.into(),
            fields: Vec::with_capacity(32),
        }
    }

    pub fn with_field(mut self, key: impl Into<Cow<'static, str>>, value: f64) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    pub fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }

    /// Name of the frame-format revision whose table produced this record.
    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Decoded value of `key`.
    ///
    /// `None` means the active revision does not define that field, not
    /// that decoding failed.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.fields.iter().map(|(k, v)| (k.as_ref(), *v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn serialize_fields<S: Serializer>(
    fields: &[(Cow<'static, str>, f64)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(fields.iter().map(|(k, v)| (k.as_ref(), v)))
}

/// Why a frame produced no record. Always recoverable: the caller logs it and
/// goes back to framing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid packet: sync marker {marker:#06X} not found in {len}-byte frame")]
    InvalidPacket { marker: u16, len: usize },
    #[error("Truncated packet: field table needs {needed} bytes from the marker, frame has {actual}")]
    Truncated { needed: usize, actual: usize },
}

/// Trait for turning framed bytes into telemetry records.
///
/// Implementations are stateless across calls so a single decoder can be
/// shared between threads.
pub trait Decoder: Send + Sync {
    /// Decode one frame; all-or-nothing.
    fn decode(&self, frame: &RawFrame) -> Result<TelemetryRecord, DecodeError>;

    /// Get the unique id of this decoder (e.g., "beacon-v2").
    fn id(&self) -> &str;

    /// Get a human-readable name.
    fn name(&self) -> &'static str;
}
