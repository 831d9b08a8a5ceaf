//! Error Handling Guidelines
//!
//! All error messages should follow this format:
//!
//! 1. **What failed**: Describe the operation that failed
//! 2. **Why it failed**: Provide the root cause if known
//! 3. **What to do**: Suggest user action when possible
//!
//! Examples:
//! - ✅ "Connection failed: localhost:10000: Connection refused (os error 111)"
//! - ✅ "Field 'odd': width 3 is not one of 1, 2, 4, 8"
//! - ❌ "Bad frame" (lacks context)
//! - ❌ "Error" (too vague)

use core_types::StreamError;
use decoders::ConfigurationError;
use thiserror::Error;

/// Why a receiver loop ended other than by request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiverError {
    /// The byte source failed or went silent
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// The frame format could not be loaded
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The consumer dropped its end of the event channel
    #[error("Channel closed: event consumer went away, receiver has no one to report to")]
    ChannelClosed,

    /// The background task panicked or was aborted
    #[error("Receiver task failed: {0}")]
    TaskFailed(String),
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReceiverError::from(StreamError::Closed);
        assert_eq!(err.to_string(), "Stream error: Stream closed by peer");
    }

    #[test]
    fn test_error_from_configuration() {
        let err: ReceiverError = ConfigurationError::UnknownRevision("beacon-v9".into()).into();
        match err {
            ReceiverError::Configuration(ConfigurationError::UnknownRevision(name)) => {
                assert_eq!(name, "beacon-v9")
            }
            _ => panic!("Wrong variant"),
        }
    }
}
