//! Async framing on top of a [`ByteSource`].

use std::collections::VecDeque;
use std::time::Duration;

use core_types::{sink_debug, ByteSource, NullSink, RawFrame, SharedSink, StreamError};
use tokio::time::Instant;

use crate::sync::SyncPattern;
use crate::sync_impl::SyncFramer;
use crate::Framer;

/// Pause after a source reports "nothing yet", so a chatty-but-empty source
/// cannot turn `read_frame` into a spin loop.
const EMPTY_READ_BACKOFF: Duration = Duration::from_millis(10);

/// Pulls chunks from a byte source until the framer completes a frame.
///
/// The accumulation buffer lives in the framer and persists across
/// `read_frame` calls, so bytes following one frame are the start of the
/// search for the next. Dropping a pending `read_frame` future cancels it
/// without losing buffered bytes.
pub struct PacketFramer<S, F = SyncFramer> {
    source: S,
    framer: F,
    ready: VecDeque<RawFrame>,
    idle_timeout: Option<Duration>,
    started: Instant,
    reported_discards: u64,
    sink: SharedSink,
}

impl<S: ByteSource> PacketFramer<S, SyncFramer> {
    pub fn new(source: S, pattern: SyncPattern, required_len: usize) -> Self {
        Self::with_framer(source, SyncFramer::new(pattern, required_len))
    }
}

impl<S: ByteSource, F: Framer> PacketFramer<S, F> {
    pub fn with_framer(source: S, framer: F) -> Self {
        Self {
            source,
            framer,
            ready: VecDeque::new(),
            idle_timeout: None,
            started: Instant::now(),
            reported_discards: 0,
            sink: NullSink::shared(),
        }
    }

    /// Fail with [`StreamError::IdleTimeout`] when no bytes arrive for
    /// `timeout`. `None` waits forever.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn framer(&self) -> &F {
        &self.framer
    }

    /// Give the source back, e.g. to close it. Buffered bytes are lost.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Read until one complete frame is available.
    ///
    /// Source errors are returned as-is; there is no reconnection.
    pub async fn read_frame(&mut self) -> Result<RawFrame, StreamError> {
        let mut last_data = Instant::now();
        loop {
            if let Some(frame) = self.ready.pop_front() {
                sink_debug!(
                    self.sink,
                    "{} framer: {}-byte frame at {}us",
                    self.framer.name(),
                    frame.len(),
                    frame.timestamp_us
                );
                return Ok(frame);
            }

            let chunk = self.next_chunk(last_data).await?;
            if chunk.is_empty() {
                tokio::time::sleep(EMPTY_READ_BACKOFF).await;
                continue;
            }
            last_data = Instant::now();

            let timestamp_us =
                u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX);
            let frames = self.framer.push(&chunk, timestamp_us);
            self.report_discards();
            self.ready.extend(frames);
        }
    }

    async fn next_chunk(&mut self, last_data: Instant) -> Result<Vec<u8>, StreamError> {
        let Some(limit) = self.idle_timeout else {
            return self.source.read_chunk().await;
        };
        let remaining = limit.saturating_sub(last_data.elapsed());
        if remaining.is_zero() {
            return Err(StreamError::IdleTimeout(limit));
        }
        match tokio::time::timeout(remaining, self.source.read_chunk()).await {
            Ok(result) => result,
            Err(_) => Err(StreamError::IdleTimeout(limit)),
        }
    }

    fn report_discards(&mut self) {
        let total = self.framer.discarded_bytes();
        if total > self.reported_discards {
            sink_debug!(
                self.sink,
                "discarded {} bytes on {} while hunting for sync",
                total - self.reported_discards,
                self.source.describe()
            );
            self.reported_discards = total;
        }
    }
}
