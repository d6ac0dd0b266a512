use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio::signal;
use tracing::{debug, error, info};
use ttylink::{ConfigLoader, Parity, Port, Received, StopBits};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Open a serial device, optionally send a line, and print what arrives.",
    long_about = "Opens the given terminal device in raw 8-bit mode, prints decoded text as it arrives, and closes the port cleanly on Ctrl+C."
)]
struct Args {
    /// Device path or a configured alias (e.g. /dev/ttyUSB0).
    device: String,

    /// Baud rate (overrides the configured default).
    #[arg(short, long)]
    baud: Option<u32>,

    /// Parity: none, even or odd.
    #[arg(short, long)]
    parity: Option<Parity>,

    /// Stop bits: 1 or 2.
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=2))]
    stop_bits: Option<u8>,

    /// Text to send after opening; "\r\n" is appended.
    #[arg(long)]
    send: Option<String>,

    /// Configuration file (defaults to the standard search path).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Write received text straight through so partial lines show up immediately.
fn print_chunk(out: &mut impl Write, chunk: &str) -> std::io::Result<()> {
    out.write_all(chunk.as_bytes())?;
    out.flush()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?.into_config(),
        None => match ConfigLoader::load() {
            Ok(loader) => loader.into_config(),
            Err(e) => {
                eprintln!("Warning: Failed to load config, using defaults: {}", e);
                ConfigLoader::with_defaults().into_config()
            }
        },
    };
    ttylink::logging::install(&config.logging)?;

    let port = Port::from_config(&args.device, &config);
    if let Some(baud) = args.baud {
        port.set_baud_rate(baud)?;
    }
    if let Some(parity) = args.parity {
        port.set_parity(parity)?;
    }
    if let Some(stop_bits) = args.stop_bits.and_then(StopBits::from_count) {
        port.set_stop_bits(stop_bits)?;
    }

    let mut text = port.subscribe_text();
    port.open()?;

    if let Some(line) = &args.send {
        let written = port.send(&format!("{line}\r\n"))?;
        info!(written, "Sent line");
    }

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            event = text.recv() => match event {
                Some(Received::Payload(chunk)) => {
                    if let Err(e) = print_chunk(&mut std::io::stdout().lock(), &chunk) {
                        debug!(error = %e, "Stdout closed, stopping");
                        break;
                    }
                }
                Some(Received::Error(e)) => error!(error = %e, "Receive error"),
                Some(Received::Ended(_)) | None => break,
            },
        }
    }

    port.close()?;
    Ok(())
}
