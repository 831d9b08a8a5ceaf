use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of the underlying connection.
///
/// Every variant is fatal to the current connection: the framer surfaces it
/// to the caller and never reconnects on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("IO error on {source_name}: {message}")]
    Io { source_name: String, message: String },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Not connected: call connect() before reading")]
    NotConnected,
    #[error("Stream closed by peer")]
    Closed,
    #[error("No bytes received for {0:?}; source considered silent")]
    IdleTimeout(Duration),
}

impl StreamError {
    pub fn io(source_name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Io {
            source_name: source_name.into(),
            message: err.to_string(),
        }
    }
}

/// A live connection yielding raw bytes on demand (serial line, TCP socket).
///
/// Implementations are picked at construction time and used uniformly
/// through this trait; the framer never knows which transport it reads.
/// The trait is object safe so a `Box<dyn ByteSource>` can be chosen at
/// runtime.
#[async_trait]
pub trait ByteSource: Send {
    /// Human readable name of the endpoint (e.g. `/dev/ttyUSB0@19200`).
    fn describe(&self) -> String;

    /// Whether `connect()` succeeded and `close()` has not run yet.
    fn is_connected(&self) -> bool;

    /// Open the underlying connection.
    async fn connect(&mut self) -> Result<(), StreamError>;

    /// Read whatever is currently available.
    ///
    /// Granularity is transport dependent: a single byte and an arbitrary
    /// chunk are both valid. An empty chunk means "nothing yet" and is not an
    /// error. End of stream is reported as `StreamError::Closed`.
    async fn read_chunk(&mut self) -> Result<Vec<u8>, StreamError>;

    /// Release the connection. Must be idempotent: the second call is a no-op.
    async fn close(&mut self) -> Result<(), StreamError>;
}

#[async_trait]
impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    async fn connect(&mut self) -> Result<(), StreamError> {
        (**self).connect().await
    }

    async fn read_chunk(&mut self) -> Result<Vec<u8>, StreamError> {
        (**self).read_chunk().await
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        (**self).close().await
    }
}
