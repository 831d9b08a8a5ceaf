use crate::kiss_impl::kiss_wire_len;
use crate::sync::{locate_from, SyncPattern};
use crate::{Framer, MIN_FRAME_LENGTH};
use core_types::RawFrame;

/// Sans-IO framer for sync-marker delimited, fixed-length packets.
///
/// Bytes before a marker are dropped. Once anchored, the framer waits for
/// `required_len` bytes counted from the marker and hands exactly that many
/// out; whatever follows stays buffered and is hunted for the next marker.
/// Marker bytes inside the payload never cut a frame short.
///
/// With KISS escaping enabled, `required_len` counts unescaped bytes and the
/// frame handed out is still the escaped wire form.
pub struct SyncFramer {
    pattern: SyncPattern,
    required_len: usize,
    kiss_escaped: bool,
    buffer: Vec<u8>,
    anchored: bool,
    // Prefix of `buffer` already searched without a match.
    scanned: usize,
    timestamp_us: Option<u64>,
    last_timestamp_us: u64,
    discarded: u64,
}

impl SyncFramer {
    /// `required_len` is raised to [`MIN_FRAME_LENGTH`] when smaller.
    pub fn new(pattern: SyncPattern, required_len: usize) -> Self {
        let required_len = required_len.max(MIN_FRAME_LENGTH);
        Self {
            pattern,
            required_len,
            kiss_escaped: false,
            buffer: Vec::with_capacity(required_len * 2),
            anchored: false,
            scanned: 0,
            timestamp_us: None,
            last_timestamp_us: 0,
            discarded: 0,
        }
    }

    /// Measure frames after KISS unescape, so each escape pair takes one
    /// extra wire byte.
    pub fn with_kiss_escaping(mut self, enabled: bool) -> Self {
        self.kiss_escaped = enabled;
        self
    }

    pub fn pattern(&self) -> SyncPattern {
        self.pattern
    }

    pub fn required_len(&self) -> usize {
        self.required_len
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Append a chunk without framing it.
    pub fn extend(&mut self, bytes: &[u8], timestamp_us: u64) {
        if bytes.is_empty() {
            return;
        }
        if self.buffer.is_empty() {
            self.timestamp_us = Some(timestamp_us);
        }
        self.last_timestamp_us = timestamp_us;
        self.buffer.extend_from_slice(bytes);
    }

    /// Take the next complete frame out of the buffer, if there is one.
    pub fn next_frame(&mut self) -> Option<RawFrame> {
        if !self.anchored && !self.anchor() {
            return None;
        }
        let frame_len = if self.kiss_escaped {
            kiss_wire_len(&self.buffer, self.required_len)?
        } else if self.buffer.len() >= self.required_len {
            self.required_len
        } else {
            return None;
        };

        let tail = self.buffer.split_off(frame_len);
        let bytes = std::mem::replace(&mut self.buffer, tail);
        let ts = self.timestamp_us.unwrap_or(self.last_timestamp_us);

        self.anchored = false;
        self.scanned = 0;
        self.timestamp_us = if self.buffer.is_empty() {
            None
        } else {
            Some(self.last_timestamp_us)
        };

        Some(RawFrame::new(bytes, ts))
    }

    fn anchor(&mut self) -> bool {
        let pattern_len = self.pattern.as_bytes().len();
        // Back off so a marker split across two chunks is still found.
        let start = self.scanned.saturating_sub(pattern_len.saturating_sub(1));

        match locate_from(&self.buffer, self.pattern.as_bytes(), start) {
            Some(idx) => {
                self.drop_front(idx);
                self.anchored = true;
                true
            }
            None => {
                // No marker can start before the last `pattern_len - 1` bytes.
                let keep = pattern_len.saturating_sub(1).min(self.buffer.len());
                self.drop_front(self.buffer.len() - keep);
                self.scanned = self.buffer.len();
                false
            }
        }
    }

    fn drop_front(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.buffer.drain(..count);
        self.discarded += count as u64;
        if self.buffer.is_empty() {
            self.timestamp_us = None;
        } else if self.timestamp_us.is_some() {
            self.timestamp_us = Some(self.last_timestamp_us);
        }
    }
}

impl Framer for SyncFramer {
    fn push(&mut self, bytes: &[u8], timestamp_us: u64) -> Vec<RawFrame> {
        self.extend(bytes, timestamp_us);
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }
        frames
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.anchored = false;
        self.scanned = 0;
        self.timestamp_us = None;
    }

    fn name(&self) -> &'static str {
        "Sync"
    }

    fn discarded_bytes(&self) -> u64 {
        self.discarded
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const MARKER: [u8; 2] = [0x08, 0x3F];

    fn framer() -> SyncFramer {
        SyncFramer::new(SyncPattern::new(MARKER), MIN_FRAME_LENGTH)
    }

    fn packet(len: usize, fill: u8) -> Vec<u8> {
        let mut bytes = vec![fill; len];
        bytes[0] = MARKER[0];
        bytes[1] = MARKER[1];
        bytes
    }

    #[test]
    fn test_marker_at_start() {
        let mut framer = framer();
        let frames = framer.push(&packet(272, 0x11), 100);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 272);
        assert_eq!(&frames[0].bytes[..2], &MARKER);
        assert_eq!(frames[0].timestamp_us, 100);
        assert_eq!(framer.discarded_bytes(), 0);
    }

    #[test]
    fn test_garbage_before_marker_is_dropped() {
        let mut framer = framer();
        let mut input = vec![0xAA; 5];
        input.extend(packet(272, 0x11));

        let frames = framer.push(&input, 100);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0].bytes[..2], &MARKER);
        assert_eq!(frames[0].bytes[2], 0x11);
        assert_eq!(framer.discarded_bytes(), 5);
    }

    #[test]
    fn test_marker_split_across_chunks() {
        let mut framer = framer();
        let body = packet(272, 0x22);

        assert!(framer.push(&[0x55, 0x55, 0x08], 100).is_empty());
        let frames = framer.push(&body[1..], 200);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].bytes, body);
    }

    #[test]
    fn test_one_byte_at_a_time() {
        let mut framer = framer();
        let body = packet(272, 0x33);
        let mut frames = Vec::new();
        for (i, b) in body.iter().enumerate() {
            frames.extend(framer.push(&[*b], i as u64));
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].bytes, body);
        assert_eq!(frames[0].timestamp_us, 0);
    }

    #[test]
    fn test_payload_marker_does_not_truncate() {
        let mut framer = framer();
        let mut body = packet(272, 0x44);
        body[100] = MARKER[0];
        body[101] = MARKER[1];

        let frames = framer.push(&body, 100);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].bytes, body);
    }

    #[test]
    fn test_never_returns_short_frame() {
        let mut framer = framer();
        assert!(framer.push(&packet(271, 0x55), 100).is_empty());
        assert!(framer.is_anchored());
        assert_eq!(framer.buffered(), 271);

        let frames = framer.push(&[0x55], 200);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 272);
        assert_eq!(frames[0].timestamp_us, 100);
    }

    #[test]
    fn test_tail_is_kept_for_next_frame() {
        let mut framer = framer();
        let mut input = packet(272, 0x01);
        input.extend([0xEE, 0xEE]);
        input.extend(packet(272, 0x02));
        input.extend([0x08]);

        let frames = framer.push(&input, 100);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].bytes[2], 0x01);
        assert_eq!(frames[1].bytes[2], 0x02);
        assert_eq!(framer.discarded_bytes(), 2);
        // Half a marker waits for the next chunk.
        assert_eq!(framer.buffered(), 1);
    }

    #[test]
    fn test_required_len_above_minimum() {
        let mut framer = SyncFramer::new(SyncPattern::new(MARKER), 325);
        assert!(framer.push(&packet(272, 0x66), 100).is_empty());
        let frames = framer.push(&[0x66; 53], 200);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 325);
    }

    #[test]
    fn test_required_len_is_clamped() {
        let framer = SyncFramer::new(SyncPattern::new(MARKER), 10);
        assert_eq!(framer.required_len(), MIN_FRAME_LENGTH);
    }

    #[test]
    fn test_hunting_buffer_stays_bounded() {
        let mut framer = framer();
        for i in 0..1000 {
            assert!(framer.push(&[0x00; 512], i).is_empty());
            assert!(framer.buffered() <= 1);
        }

        let frames = framer.push(&packet(272, 0x77), 5000);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].timestamp_us, 5000);
        assert_eq!(framer.discarded_bytes(), 512 * 1000);
    }

    #[test]
    fn test_no_marker_never_yields() {
        let mut framer = framer();
        let noise: Vec<u8> = (0..4096u32).map(|i| (i % 7) as u8).collect();
        assert!(framer.push(&noise, 1).is_empty());
        assert!(!framer.is_anchored());
    }

    fn kiss_escape(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for &b in data {
            match b {
                0xC0 => out.extend([0xDB, 0xDC]),
                0xDB => out.extend([0xDB, 0xDD]),
                _ => out.push(b),
            }
        }
        out
    }

    #[test]
    fn test_escaped_frame_is_measured_unescaped() {
        let mut framer = framer().with_kiss_escaping(true);
        let mut body = packet(272, 0x11);
        body[50] = 0xC0;
        body[271] = 0xDB;
        let mut input = kiss_escape(&body);
        assert_eq!(input.len(), 274);
        input.extend(packet(272, 0x22));

        let frames = framer.push(&input, 100);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].len(), 274);
        assert_eq!(crate::kiss_unescape(&frames[0].bytes), body);
        assert_eq!(frames[1].bytes[2], 0x22);
        assert_eq!(framer.discarded_bytes(), 0);
    }

    #[test]
    fn test_escape_pair_split_at_frame_end() {
        let mut framer = framer().with_kiss_escaping(true);
        let mut body = packet(272, 0x11);
        body[271] = 0xC0;
        let wire = kiss_escape(&body);

        // Everything but the TFEND: the last logical byte is not known yet.
        assert!(framer.push(&wire[..272], 100).is_empty());
        let frames = framer.push(&wire[272..], 200);
        assert_eq!(frames.len(), 1);
        assert_eq!(crate::kiss_unescape(&frames[0].bytes), body);
    }

    #[test]
    fn test_reset() {
        let mut framer = framer();
        framer.push(&packet(100, 0x01), 100);
        framer.reset();
        assert_eq!(framer.buffered(), 0);
        assert!(!framer.is_anchored());

        let frames = framer.push(&packet(272, 0x02), 200);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].timestamp_us, 200);
    }
}
