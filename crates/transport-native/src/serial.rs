use std::io::{ErrorKind, Read as _};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use async_trait::async_trait;
use core_types::{sink_debug, sink_warn, ByteSource, NullSink, SharedSink, StreamError};
use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{DEFAULT_BAUD_RATE, SERIAL_CHANNEL_CAPACITY, SERIAL_POLL_TIMEOUT, SERIAL_READ_BUFFER};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ParityMode {
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Hardware,
    Software,
}

/// Line settings for a serial port.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: ParityMode,
    pub flow_control: FlowControl,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid framing '{0}': expected data bits (5-8), parity (N/E/O) and stop bits (1-2), e.g. 8N1")]
pub struct FramingParseError(String);

impl SerialConfig {
    /// Create a standard 8N1 configuration at specified baud rate
    pub fn new_8n1(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: ParityMode::None,
            flow_control: FlowControl::None,
        }
    }

    /// Parse framing string (e.g., "8N1", "7E1") into configuration
    pub fn from_framing(framing: &str, baud_rate: u32) -> Result<Self, FramingParseError> {
        let err = || FramingParseError(framing.to_string());
        let mut chars = framing.trim().chars();
        let (Some(data), Some(parity), Some(stop), None) =
            (chars.next(), chars.next(), chars.next(), chars.next())
        else {
            return Err(err());
        };

        let data_bits = match data {
            '5'..='8' => data as u8 - b'0',
            _ => return Err(err()),
        };
        let parity = match parity.to_ascii_uppercase() {
            'N' => ParityMode::None,
            'E' => ParityMode::Even,
            'O' => ParityMode::Odd,
            _ => return Err(err()),
        };
        let stop_bits = match stop {
            '1' => 1,
            '2' => 2,
            _ => return Err(err()),
        };

        Ok(Self {
            baud_rate,
            data_bits,
            stop_bits,
            parity,
            flow_control: FlowControl::None,
        })
    }

    fn builder(&self, path: &str) -> serialport::SerialPortBuilder {
        let data_bits = match self.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            _ => serialport::DataBits::Eight,
        };
        let stop_bits = match self.stop_bits {
            2 => serialport::StopBits::Two,
            _ => serialport::StopBits::One,
        };
        let parity = match self.parity {
            ParityMode::None => serialport::Parity::None,
            ParityMode::Even => serialport::Parity::Even,
            ParityMode::Odd => serialport::Parity::Odd,
        };
        let flow_control = match self.flow_control {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
            FlowControl::Software => serialport::FlowControl::Software,
        };

        serialport::new(path, self.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(flow_control)
            .timeout(SERIAL_POLL_TIMEOUT)
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new_8n1(DEFAULT_BAUD_RATE)
    }
}

impl FromStr for SerialConfig {
    type Err = FramingParseError;

    /// Accepts "8N1" or "19200,8N1".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(',') {
            Some((baud, framing)) => {
                let baud_rate = baud
                    .trim()
                    .parse()
                    .map_err(|_| FramingParseError(s.to_string()))?;
                Self::from_framing(framing, baud_rate)
            }
            None => Self::from_framing(s, DEFAULT_BAUD_RATE),
        }
    }
}

/// Names of the serial ports the OS reports.
pub fn list_ports() -> Result<Vec<String>, StreamError> {
    let ports = serialport::available_ports().map_err(|e| StreamError::io("serial", e))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Serial line byte source.
///
/// `serialport` is blocking, so a dedicated reader thread polls the port and
/// forwards chunks over a channel; `read_chunk` awaits that channel.
pub struct SerialSource {
    path: String,
    config: SerialConfig,
    rx: Option<mpsc::Receiver<Result<Vec<u8>, StreamError>>>,
    shutdown: Option<Arc<AtomicBool>>,
    reader: Option<JoinHandle<()>>,
    sink: SharedSink,
}

impl SerialSource {
    pub fn new(path: impl Into<String>, config: SerialConfig) -> Self {
        Self {
            path: path.into(),
            config,
            rx: None,
            shutdown: None,
            reader: None,
            sink: NullSink::shared(),
        }
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

fn read_loop(
    mut port: Box<dyn SerialPort>,
    name: String,
    tx: mpsc::Sender<Result<Vec<u8>, StreamError>>,
    shutdown: Arc<AtomicBool>,
) {
    let mut buffer = [0u8; SERIAL_READ_BUFFER];
    while !shutdown.load(Ordering::Relaxed) {
        match port.read(&mut buffer) {
            Ok(0) => {}
            Ok(n) => {
                let chunk = buffer.get(..n).unwrap_or_default().to_vec();
                if tx.blocking_send(Ok(chunk)).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                let _ = tx.blocking_send(Err(StreamError::io(name, e)));
                return;
            }
        }
    }
}

#[async_trait]
impl ByteSource for SerialSource {
    fn describe(&self) -> String {
        format!("{}@{}", self.path, self.config.baud_rate)
    }

    fn is_connected(&self) -> bool {
        self.rx.is_some()
    }

    async fn connect(&mut self) -> Result<(), StreamError> {
        if self.is_connected() {
            return Ok(());
        }
        sink_debug!(self.sink, "Opening serial device {}", self.describe());

        let port = self
            .config
            .builder(&self.path)
            .open()
            .map_err(|e| StreamError::ConnectionFailed(format!("{}: {}", self.describe(), e)))?;

        let (tx, rx) = mpsc::channel(SERIAL_CHANNEL_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = shutdown.clone();
        let name = self.describe();
        let reader = std::thread::Builder::new()
            .name("serial-reader".into())
            .spawn(move || read_loop(port, name, tx, thread_shutdown))
            .map_err(|e| StreamError::ConnectionFailed(e.to_string()))?;

        self.rx = Some(rx);
        self.shutdown = Some(shutdown);
        self.reader = Some(reader);
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Vec<u8>, StreamError> {
        let rx = self.rx.as_mut().ok_or(StreamError::NotConnected)?;
        match rx.recv().await {
            Some(chunk) => chunk,
            None => Err(StreamError::Closed),
        }
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.store(true, Ordering::Relaxed);
        }
        // Dropping the receiver also unblocks a reader stuck on a full channel.
        self.rx = None;

        let Some(reader) = self.reader.take() else {
            return Ok(());
        };
        let joined = tokio::task::spawn_blocking(move || reader.join()).await;
        if !matches!(joined, Ok(Ok(()))) {
            sink_warn!(self.sink, "serial reader thread for {} did not exit cleanly", self.path);
        }
        sink_debug!(self.sink, "Serial connection {} closed", self.describe());
        Ok(())
    }
}
