//! # Native Transports
//!
//! [`ByteSource`](core_types::ByteSource) implementations for a serial line
//! (via `serialport`) and a TCP socket (via `tokio`).

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

use std::time::Duration;

pub mod serial;
pub mod tcp;

pub use serial::{list_ports, FlowControl, FramingParseError, ParityMode, SerialConfig, SerialSource};
pub use tcp::TcpSource;

/// Ground-station radios default to 19200 baud.
pub const DEFAULT_BAUD_RATE: u32 = 19_200;

/// Where the ground-station TNC bridge listens by default.
pub const DEFAULT_TCP_ADDR: &str = "localhost:10000";

/// Largest chunk a TCP read returns.
pub const TCP_CHUNK_SIZE: usize = 1024;

/// Serial read timeout. Bounds how long `close()` waits for the reader
/// thread to notice shutdown.
pub const SERIAL_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Chunks buffered between the serial reader thread and `read_chunk()`.
pub const SERIAL_CHANNEL_CAPACITY: usize = 64;

/// Scratch buffer for one serial read.
pub const SERIAL_READ_BUFFER: usize = 1024;
