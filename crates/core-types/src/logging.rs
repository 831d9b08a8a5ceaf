//! Injected logging capability.
//!
//! Framers, decoders and the receiver loop take an explicit [`SharedSink`]
//! instead of reaching for a process-wide logger. The default sink forwards
//! to the `log` facade under a fixed target, so the binary decides the
//! backend (`env_logger`) and tests can swap in a [`MemorySink`].

use std::fmt;
use std::sync::{Arc, Mutex};

pub use log::Level;

/// Destination for diagnostic messages.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, args: fmt::Arguments<'_>);
}

pub type SharedSink = Arc<dyn LogSink>;

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        (**self).log(level, args)
    }
}

/// Forwards every message to the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct LogCrateSink {
    target: &'static str,
}

impl LogCrateSink {
    pub const fn new(target: &'static str) -> Self {
        Self { target }
    }

    pub fn shared(target: &'static str) -> SharedSink {
        Arc::new(Self::new(target))
    }
}

impl LogSink for LogCrateSink {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: self.target, level, "{}", args);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NullSink {
    pub fn shared() -> SharedSink {
        Arc::new(Self)
    }
}

impl LogSink for NullSink {
    fn log(&self, _level: Level, _args: fmt::Arguments<'_>) {}
}

/// Keeps messages in memory so tests can assert on what was reported.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, level: Level) -> usize {
        self.entries()
            .iter()
            .filter(|(entry_level, _)| *entry_level == level)
            .count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|(_, message)| message.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, args.to_string()));
        }
    }
}

/// Log a debug-level message to an injected sink.
///
/// # Example
/// ```
/// use core_types::{logging::MemorySink, sink_debug};
/// let sink = MemorySink::new();
/// sink_debug!(sink, "anchored at offset {}", 12);
/// assert!(sink.contains("offset 12"));
/// ```
#[macro_export]
macro_rules! sink_debug {
    ($sink:expr, $($arg:tt)*) => {
        $crate::logging::LogSink::log(&*$sink, $crate::logging::Level::Debug, format_args!($($arg)*))
    };
}

/// Log an info-level message to an injected sink.
#[macro_export]
macro_rules! sink_info {
    ($sink:expr, $($arg:tt)*) => {
        $crate::logging::LogSink::log(&*$sink, $crate::logging::Level::Info, format_args!($($arg)*))
    };
}

/// Log a warning to an injected sink.
///
/// Use for recoverable conditions (skipped frames, discarded bytes).
#[macro_export]
macro_rules! sink_warn {
    ($sink:expr, $($arg:tt)*) => {
        $crate::logging::LogSink::log(&*$sink, $crate::logging::Level::Warn, format_args!($($arg)*))
    };
}

/// Log an error to an injected sink.
#[macro_export]
macro_rules! sink_error {
    ($sink:expr, $($arg:tt)*) => {
        $crate::logging::LogSink::log(&*$sink, $crate::logging::Level::Error, format_args!($($arg)*))
    };
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_levels() {
        let sink = MemorySink::new();
        sink_debug!(sink, "debug {}", 1);
        sink_warn!(sink, "skipped frame: {}", "no marker");
        sink_error!(sink, "stream closed");

        assert_eq!(sink.entries().len(), 3);
        assert_eq!(sink.count(Level::Warn), 1);
        assert!(sink.contains("skipped frame: no marker"));
    }

    #[test]
    fn test_shared_sinks_accept_macros() {
        let shared: SharedSink = NullSink::shared();
        sink_info!(shared, "ignored {}", 42);

        let forwarding: SharedSink = LogCrateSink::shared("beacon::test");
        sink_debug!(forwarding, "no logger installed, still fine");
    }
}
