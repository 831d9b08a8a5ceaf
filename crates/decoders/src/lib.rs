#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod field_table;
pub mod format;
pub mod mode;
pub mod telemetry;

pub use core_types::{DecodeError, Decoder};
pub use field_table::{ByteOrder, ConfigurationError, FieldDescriptor, FieldTable};
pub use format::{FrameFormat, BEACON_SYNC, BUILTIN_REVISIONS, DEFAULT_REVISION};
pub use mode::{AdcsMode, ADCS_MODE};
pub use telemetry::TelemetryDecoder;
