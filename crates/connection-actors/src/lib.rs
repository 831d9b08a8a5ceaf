//! # Connection Actors
//!
//! The background receiver that turns a byte source into telemetry events.
//!
//! ## Pipeline
//!
//! - **PacketFramer**: pulls chunks from the source until a sync-aligned
//!   frame is complete
//! - **kiss_unescape** (optional): undoes link-layer byte stuffing
//! - **TelemetryDecoder**: maps the frame to a named, scaled record
//!
//! Each stage runs inside one tokio task; the consumer sees only
//! [`ReceiverEvent`](actor_protocol::ReceiverEvent)s.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod cancellation;
pub mod constants;
pub mod receiver_actor;

pub use cancellation::race_with_cancellation;
pub use receiver_actor::{spawn_receiver, ReceiverConfig, ReceiverHandle};
