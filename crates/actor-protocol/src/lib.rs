//! # Actor Protocol
//!
//! Message and error definitions shared between the receiver loop and its
//! consumers. No I/O and no runtime dependencies, so everything here is
//! testable without a byte source.
//!
//! ## Message Flow
//!
//! ```text
//! ByteSource → Receiver task → ReceiverEvent → Consumer
//!                    ↑
//!             ReceiverHandle::stop()
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod errors;
pub mod messages;

pub use errors::ReceiverError;
pub use messages::{ReceiverEvent, ReceiverReport, ReceiverSummary, StopReason};
