#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

use core_types::RawFrame;

pub mod kiss_impl;
pub mod packet;
pub mod sync;
pub mod sync_impl;

pub use kiss_impl::{kiss_unescape, kiss_wire_len};
pub use packet::PacketFramer;
pub use sync::{locate, locate_from, SyncPattern};
pub use sync_impl::SyncFramer;

/// Shortest frame any framer hands out, counted from the first marker byte.
pub const MIN_FRAME_LENGTH: usize = 272;

/// Trait for converting a stream of bytes into discrete frames.
pub trait Framer: Send {
    /// Ingest new bytes and return any complete frames found.
    ///
    /// # Arguments
    /// * `bytes` - The new chunk of data read from transport.
    /// * `timestamp_us` - The timestamp associated with this chunk.
    fn push(&mut self, bytes: &[u8], timestamp_us: u64) -> Vec<RawFrame>;

    /// Reset internal state (e.g., clear buffers).
    fn reset(&mut self);

    /// Get the name of the framer.
    fn name(&self) -> &'static str;

    /// Total bytes thrown away while hunting for a frame start.
    fn discarded_bytes(&self) -> u64 {
        0
    }
}
