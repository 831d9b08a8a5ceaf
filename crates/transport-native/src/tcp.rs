use async_trait::async_trait;
use core_types::{sink_debug, ByteSource, NullSink, SharedSink, StreamError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::TCP_CHUNK_SIZE;

/// TCP byte source, e.g. a TNC or SDR bridge forwarding the radio stream.
pub struct TcpSource {
    addr: String,
    stream: Option<TcpStream>,
    chunk_size: usize,
    sink: SharedSink,
}

impl TcpSource {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
            chunk_size: TCP_CHUNK_SIZE,
            sink: NullSink::shared(),
        }
    }

    /// Upper bound on bytes returned by one `read_chunk` (at least 1).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }
}

#[async_trait]
impl ByteSource for TcpSource {
    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn connect(&mut self) -> Result<(), StreamError> {
        if self.is_connected() {
            return Ok(());
        }
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| StreamError::ConnectionFailed(format!("{}: {}", self.addr, e)))?;
        if let Err(e) = stream.set_nodelay(true) {
            sink_debug!(self.sink, "TCP_NODELAY not set on {}: {}", self.describe(), e);
        }
        sink_debug!(self.sink, "Connected to {}", self.describe());
        self.stream = Some(stream);
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Vec<u8>, StreamError> {
        let stream = self.stream.as_mut().ok_or(StreamError::NotConnected)?;
        let mut buffer = vec![0u8; self.chunk_size];
        let n = stream
            .read(&mut buffer)
            .await
            .map_err(|e| StreamError::io(format!("tcp://{}", self.addr), e))?;
        if n == 0 {
            return Err(StreamError::Closed);
        }
        buffer.truncate(n);
        Ok(buffer)
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                sink_debug!(self.sink, "Shutdown of {} failed: {}", self.describe(), e);
            }
            sink_debug!(self.sink, "Closed {}", self.describe());
        }
        Ok(())
    }
}
