use std::sync::Arc;

use core_types::{sink_debug, DecodeError, Decoder, NullSink, RawFrame, SharedSink, TelemetryRecord};
use framing::locate;

use crate::format::FrameFormat;

/// Table-driven decoder for sync-marker aligned beacon frames.
///
/// Holds no per-frame state: decoding the same frame twice yields identical
/// records, and one decoder can serve several receivers.
pub struct TelemetryDecoder {
    format: Arc<FrameFormat>,
    sink: SharedSink,
}

impl TelemetryDecoder {
    pub fn new(format: FrameFormat) -> Self {
        Self {
            format: Arc::new(format),
            sink: NullSink::shared(),
        }
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn format(&self) -> &FrameFormat {
        &self.format
    }
}

impl Decoder for TelemetryDecoder {
    fn decode(&self, frame: &RawFrame) -> Result<TelemetryRecord, DecodeError> {
        let sync = self.format.sync();
        let Some(start) = locate(&frame.bytes, sync.as_bytes()) else {
            return Err(DecodeError::InvalidPacket {
                marker: sync.as_u16(),
                len: frame.len(),
            });
        };
        if start > 0 {
            sink_debug!(self.sink, "marker at offset {}, re-slicing frame", start);
        }
        let packet = frame.bytes.get(start..).unwrap_or_default();

        let fields = self.format.fields();
        if packet.len() < fields.extent() {
            return Err(DecodeError::Truncated {
                needed: fields.extent(),
                actual: packet.len(),
            });
        }

        let mut record = TelemetryRecord::new(frame.timestamp_us, self.format.revision_cow());
        for field in fields.iter() {
            let value = field.read(packet).ok_or(DecodeError::Truncated {
                needed: fields.extent(),
                actual: packet.len(),
            })?;
            record = record.with_field(field.name.clone(), value);
        }
        Ok(record)
    }

    fn id(&self) -> &str {
        self.format.revision()
    }

    fn name(&self) -> &'static str {
        "Beacon Telemetry"
    }
}
