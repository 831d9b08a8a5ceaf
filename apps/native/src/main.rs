use std::error::Error;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use actor_protocol::{ReceiverEvent, StopReason};
use clap::{Args, Parser, Subcommand};
use connection_actors::{spawn_receiver, ReceiverConfig};
use core_types::{ByteSource, LogCrateSink, TelemetryRecord};
use decoders::{AdcsMode, FrameFormat, TelemetryDecoder, BUILTIN_REVISIONS, DEFAULT_REVISION};
use futures::StreamExt;
use transport_native::{list_ports, SerialConfig, SerialSource, TcpSource, DEFAULT_TCP_ADDR};

#[derive(Parser)]
#[command(name = "beacon-rx")]
#[command(about = "Receive and decode satellite beacon telemetry", long_about = None)]
struct BeaconCli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports reported by the OS
    Ports,

    /// List built-in frame formats, or print one as JSON
    Formats {
        /// Print this revision's layout as an editable JSON format file
        #[arg(long)]
        dump: Option<String>,
    },

    /// Receive from a serial port
    Serial {
        /// Device path, e.g. /dev/ttyUSB0 or COM3
        path: String,

        /// Baud rate
        #[arg(short, long, default_value_t = transport_native::DEFAULT_BAUD_RATE)]
        baud: u32,

        /// Data bits, parity and stop bits
        #[arg(long, default_value = "8N1")]
        framing: String,

        #[command(flatten)]
        receive: ReceiveArgs,
    },

    /// Receive from a TCP bridge
    Tcp {
        /// host:port of the bridge
        #[arg(default_value = DEFAULT_TCP_ADDR)]
        addr: String,

        #[command(flatten)]
        receive: ReceiveArgs,
    },
}

#[derive(Args)]
struct ReceiveArgs {
    /// Built-in revision name or path to a .json format file
    #[arg(short, long, default_value = DEFAULT_REVISION)]
    format: String,

    /// Undo KISS byte stuffing before decoding
    #[arg(long)]
    kiss: bool,

    /// Give up after this many seconds without data (0 waits forever)
    #[arg(long, default_value_t = 30)]
    idle_timeout_secs: u64,

    /// Print one JSON object per record instead of a table row
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = BeaconCli::parse();
    match cli.command {
        Commands::Ports => {
            for port in list_ports()? {
                println!("{port}");
            }
            Ok(())
        }
        Commands::Formats { dump: Some(name) } => {
            let format = FrameFormat::by_name(&name)?;
            println!("{}", serde_json::to_string_pretty(&format)?);
            Ok(())
        }
        Commands::Formats { dump: None } => {
            for name in BUILTIN_REVISIONS {
                let format = FrameFormat::by_name(name)?;
                let marker = if *name == DEFAULT_REVISION { " (default)" } else { "" };
                println!(
                    "{name}{marker}: sync {}, {} fields, {} bytes per frame",
                    format.sync(),
                    format.fields().len(),
                    format.required_length()
                );
            }
            Ok(())
        }
        Commands::Serial {
            path,
            baud,
            framing,
            receive,
        } => {
            let config = SerialConfig::from_framing(&framing, baud)?;
            let source = SerialSource::new(path, config)
                .with_sink(LogCrateSink::shared("beacon::serial"));
            receive_from(Box::new(source), receive).await
        }
        Commands::Tcp { addr, receive } => {
            let source = TcpSource::new(addr).with_sink(LogCrateSink::shared("beacon::tcp"));
            receive_from(Box::new(source), receive).await
        }
    }
}

async fn receive_from(source: Box<dyn ByteSource>, args: ReceiveArgs) -> Result<(), Box<dyn Error>> {
    let format = FrameFormat::resolve(&args.format)?;
    log::info!(
        "Decoding {} (sync {}, {} bytes per frame) from {}",
        format.revision(),
        format.sync(),
        format.required_length(),
        source.describe()
    );

    let decoder = TelemetryDecoder::new(format).with_sink(LogCrateSink::shared("beacon::decoder"));
    let config = ReceiverConfig {
        idle_timeout: (args.idle_timeout_secs > 0).then(|| Duration::from_secs(args.idle_timeout_secs)),
        kiss_unescape: args.kiss,
        ..Default::default()
    };
    let (handle, mut events) = spawn_receiver(source, Arc::new(decoder), config, None);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stopping = false;

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(ReceiverEvent::Record(record)) => {
                    if args.json {
                        println!("{}", serde_json::to_string(&record)?);
                    } else {
                        println!("{}", format_record(&record));
                    }
                }
                Some(ReceiverEvent::Connected { source }) => log::info!("Connected to {source}"),
                Some(ReceiverEvent::FrameSkipped { .. }) | Some(ReceiverEvent::Stopped(_)) => {}
                None => break,
            },
            _ = &mut ctrl_c, if !stopping => {
                log::info!("Interrupted, stopping receiver");
                handle.stop();
                stopping = true;
            }
        }
    }

    let report = handle.join().await;
    let summary = report.summary;
    log::info!(
        "{} frames, {} decoded, {} skipped, {} bytes discarded",
        summary.frames_read,
        summary.records_decoded,
        summary.frames_skipped,
        summary.bytes_discarded
    );
    match report.reason {
        StopReason::Cancelled => Ok(()),
        StopReason::Failed(e) => Err(e.into()),
    }
}

fn format_record(record: &TelemetryRecord) -> String {
    let mut line = format!("[{:>12.3}s] {}", record.timestamp_us() as f64 / 1e6, record.revision());
    if let Some(mode) = AdcsMode::from_record(record) {
        let _ = write!(line, " mode={mode}");
    }
    for (name, value) in record.iter() {
        if name != decoders::ADCS_MODE {
            let _ = write!(line, " {name}={value:.6}");
        }
    }
    line
}
