//! Centralized configuration constants for the receiver
//!
//! All timeout and capacity values are defined here with the rationale
//! behind them.
//!
//! **Before changing any constant:**
//! 1. Read its full documentation comment
//! 2. Understand the link or protocol basis for the value
//! 3. Update documentation with your findings

/// Receiver loop timing and buffering
pub mod receiver {
    /// Interval at which a pending read checks the cancel flag (milliseconds)
    ///
    /// **Value**: 50ms
    ///
    /// **Rationale**: `stop()` should feel immediate to an operator pressing
    /// Ctrl-C. 50ms is well below human reaction time while costing only
    /// 20 wakeups per second on an idle link.
    ///
    /// **Used in**: receiver_actor.rs
    pub const CANCEL_POLL_MS: u64 = 50;

    /// Default time without any byte before the link is declared dead (seconds)
    ///
    /// **Value**: 30s
    ///
    /// **Rationale**: A beacon is transmitted every few seconds while the
    /// satellite is in view, and TNC bridges forward bytes as they arrive.
    /// 30 seconds of silence means the pass has ended or the bridge has hung.
    ///
    /// **Trade-offs**:
    /// - Shorter: spurious failures on long beacon intervals
    /// - Longer: a hung TCP bridge goes unnoticed for longer
    ///
    /// **Used in**: receiver_actor.rs (ReceiverConfig::default)
    pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

    /// Capacity of the event channel from the receiver task to its consumer
    ///
    /// **Value**: 64 events
    ///
    /// **Rationale**: One record per beacon; a consumer that falls 64 beacons
    /// behind is broken, not slow. When full, the receiver waits (bounded
    /// memory) instead of dropping records.
    ///
    /// **Used in**: receiver_actor.rs
    pub const EVENT_CHANNEL_CAPACITY: usize = 64;

    /// How long the receiver waits to deliver the final `Stopped` event
    /// (milliseconds)
    ///
    /// **Value**: 1000ms
    ///
    /// **Rationale**: After `stop()` a consumer may no longer be draining
    /// events. The report is still returned from `join()`, so giving up after
    /// a second only loses the duplicate.
    ///
    /// **Used in**: receiver_actor.rs
    pub const STOP_EVENT_TIMEOUT_MS: u64 = 1000;
}
