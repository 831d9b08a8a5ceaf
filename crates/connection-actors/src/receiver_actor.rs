use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actor_protocol::{ReceiverError, ReceiverEvent, ReceiverReport, ReceiverSummary, StopReason};
use core_types::{
    sink_debug, sink_info, sink_warn, ByteSource, Decoder, LogCrateSink, SharedSink,
};
use decoders::TelemetryDecoder;
use framing::{kiss_unescape, Framer, PacketFramer, SyncFramer};
use futures::SinkExt;
use futures_channel::mpsc;
use tokio::task::JoinHandle;

use crate::cancellation::race_with_cancellation;
use crate::constants::receiver::{
    CANCEL_POLL_MS, DEFAULT_IDLE_TIMEOUT_SECS, EVENT_CHANNEL_CAPACITY, STOP_EVENT_TIMEOUT_MS,
};

/// Tunables for one receiver loop.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Fail with `IdleTimeout` after this long without bytes; `None` waits forever
    pub idle_timeout: Option<Duration>,
    /// Capacity of the event channel
    pub channel_capacity: usize,
    /// Undo KISS byte stuffing between framing and decoding. Frame length is
    /// then counted after unescaping.
    pub kiss_unescape: bool,
    /// How often a pending read checks for `stop()`
    pub cancel_poll_interval: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Some(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)),
            channel_capacity: EVENT_CHANNEL_CAPACITY,
            kiss_unescape: false,
            cancel_poll_interval: Duration::from_millis(CANCEL_POLL_MS),
        }
    }
}

/// Control side of a running receiver.
pub struct ReceiverHandle {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<ReceiverReport>,
}

impl ReceiverHandle {
    /// Ask the loop to stop. Returns immediately; the loop drops its pending
    /// read within one poll interval, closes the source and emits `Stopped`.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to end.
    pub async fn join(self) -> ReceiverReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => ReceiverReport {
                reason: StopReason::Failed(ReceiverError::TaskFailed(e.to_string())),
                summary: ReceiverSummary::default(),
            },
        }
    }

    /// `stop()` followed by `join()`.
    pub async fn shutdown(self) -> ReceiverReport {
        self.stop();
        self.join().await
    }
}

/// Start a background receiver reading `source` and decoding with `decoder`.
///
/// The source is connected by the task if it is not already. Events arrive
/// on the returned channel, which closes after `Stopped` is sent; keep
/// draining it until then.
pub fn spawn_receiver<S>(
    source: S,
    decoder: Arc<TelemetryDecoder>,
    config: ReceiverConfig,
    sink: Option<SharedSink>,
) -> (ReceiverHandle, mpsc::Receiver<ReceiverEvent>)
where
    S: ByteSource + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(config.channel_capacity);
    let cancel = Arc::new(AtomicBool::new(false));
    let sink = sink.unwrap_or_else(|| LogCrateSink::shared("beacon::receiver"));

    let task = tokio::spawn(run(source, decoder, config, sink, cancel.clone(), event_tx));

    (ReceiverHandle { cancel, task }, event_rx)
}

async fn run<S: ByteSource>(
    mut source: S,
    decoder: Arc<TelemetryDecoder>,
    config: ReceiverConfig,
    sink: SharedSink,
    cancel: Arc<AtomicBool>,
    mut event_tx: mpsc::Sender<ReceiverEvent>,
) -> ReceiverReport {
    let poll = config.cancel_poll_interval;
    let mut summary = ReceiverSummary::default();

    let connected = if source.is_connected() {
        Some(Ok(()))
    } else {
        race_with_cancellation(source.connect(), cancel.clone(), poll).await
    };
    let reason = match connected {
        None => Some(StopReason::Cancelled),
        Some(Err(e)) => Some(StopReason::Failed(e.into())),
        Some(Ok(())) => None,
    };

    let (reason, mut source) = match reason {
        Some(reason) => (reason, source),
        None => {
            sink_info!(sink, "Receiver started on {}", source.describe());
            let connected = ReceiverEvent::Connected {
                source: source.describe(),
            };
            let format = decoder.format();
            let sync_framer = SyncFramer::new(format.sync(), format.required_length())
                .with_kiss_escaping(config.kiss_unescape);
            let mut framer = PacketFramer::with_framer(source, sync_framer)
                .with_idle_timeout(config.idle_timeout)
                .with_sink(sink.clone());

            let reason = match event_tx.send(connected).await {
                Ok(()) => {
                    receive_loop(&mut framer, &decoder, &config, &sink, &cancel, &mut event_tx, &mut summary)
                        .await
                }
                Err(_) => StopReason::Failed(ReceiverError::ChannelClosed),
            };
            summary.bytes_discarded = framer.framer().discarded_bytes();
            (reason, framer.into_source())
        }
    };

    if let Err(e) = source.close().await {
        sink_warn!(sink, "Closing {} failed: {}", source.describe(), e);
    }

    match &reason {
        StopReason::Cancelled => sink_info!(sink, "Receiver stopped: {:?}", summary),
        StopReason::Failed(e) => sink_warn!(sink, "Receiver failed: {} ({:?})", e, summary),
    }

    let report = ReceiverReport { reason, summary };
    let stopped = ReceiverEvent::Stopped(report.clone());
    let timeout = Duration::from_millis(STOP_EVENT_TIMEOUT_MS);
    if !matches!(tokio::time::timeout(timeout, event_tx.send(stopped)).await, Ok(Ok(()))) {
        sink_debug!(sink, "Stopped event not delivered, consumer gone or not draining");
    }
    report
}

async fn receive_loop<S: ByteSource>(
    framer: &mut PacketFramer<S>,
    decoder: &TelemetryDecoder,
    config: &ReceiverConfig,
    sink: &SharedSink,
    cancel: &Arc<AtomicBool>,
    event_tx: &mut mpsc::Sender<ReceiverEvent>,
    summary: &mut ReceiverSummary,
) -> StopReason {
    let poll = config.cancel_poll_interval;
    loop {
        if cancel.load(Ordering::Acquire) {
            return StopReason::Cancelled;
        }

        let frame = match race_with_cancellation(framer.read_frame(), cancel.clone(), poll).await {
            None => return StopReason::Cancelled,
            Some(Err(e)) => return StopReason::Failed(e.into()),
            Some(Ok(frame)) => frame,
        };
        summary.frames_read += 1;

        let frame = if config.kiss_unescape {
            frame.map_bytes(|bytes| kiss_unescape(&bytes))
        } else {
            frame
        };

        let event = match decoder.decode(&frame) {
            Ok(record) => {
                summary.records_decoded += 1;
                ReceiverEvent::Record(record)
            }
            Err(reason) => {
                summary.frames_skipped += 1;
                sink_warn!(sink, "Skipping frame at {}us: {}", frame.timestamp_us, reason);
                ReceiverEvent::FrameSkipped {
                    timestamp_us: frame.timestamp_us,
                    reason,
                }
            }
        };

        match race_with_cancellation(event_tx.send(event), cancel.clone(), poll).await {
            None => return StopReason::Cancelled,
            Some(Err(_)) => return StopReason::Failed(ReceiverError::ChannelClosed),
            Some(Ok(())) => {}
        }
    }
}
