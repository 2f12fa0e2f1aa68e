//! midi-tunnel: pipe stdin/stdout through a byte tunnel over the system
//! MIDI bus.
//!
//! Connects a tunnel endpoint to a pair of named MIDI ports and then moves
//! bytes in both directions until stdin reaches EOF or Ctrl-C is pressed:
//!
//! ```text
//! stdin  ─▶ TunnelEndpoint::write ─▶ control-change events ─▶ output port
//! input port ─▶ decoded bytes ─▶ TunnelEndpoint::read ─▶ stdout
//! ```
//!
//! Use `--list-ports` to discover the port names visible on this machine.

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use miditunnel::transport::midir_backend::MidirTransport;
use miditunnel::transport::MidiTransport;
use miditunnel::TunnelEndpoint;

#[derive(Parser)]
#[command(
    name = "midi-tunnel",
    about = "Pipe stdin/stdout through a byte tunnel over the system MIDI bus"
)]
struct Args {
    /// List the MIDI ports visible on this machine and exit.
    #[arg(long)]
    list_ports: bool,

    /// Name of the MIDI port to receive events from.
    #[arg(long, env = "MIDI_TUNNEL_INPUT_PORT")]
    input_port: Option<String>,

    /// Name of the MIDI port to send events to.
    #[arg(long, env = "MIDI_TUNNEL_OUTPUT_PORT")]
    output_port: Option<String>,

    /// Client name announced to the OS MIDI stack.
    #[arg(long, default_value = "miditunnel")]
    client_name: String,

    /// Log level when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let transport = MidirTransport::new(args.client_name.as_str());

    if args.list_ports {
        println!("input ports:");
        for name in transport.input_ports() {
            println!("  {name}");
        }
        println!("output ports:");
        for name in transport.output_ports() {
            println!("  {name}");
        }
        return Ok(());
    }

    let input_port = args
        .input_port
        .ok_or_else(|| anyhow::anyhow!("--input-port is required (try --list-ports)"))?;
    let output_port = args
        .output_port
        .ok_or_else(|| anyhow::anyhow!("--output-port is required (try --list-ports)"))?;

    let endpoint = Arc::new(TunnelEndpoint::connect(
        &transport,
        &input_port,
        &output_port,
    )?);
    info!("tunnel open: reading '{input_port}', writing '{output_port}'");

    // ── Bus → stdout ──────────────────────────────────────────────────────────
    let inbound = {
        let endpoint = Arc::clone(&endpoint);
        tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            loop {
                // Wait for the first byte, then drain whatever else arrived.
                let mut bytes = match endpoint.read_exact(1).await {
                    Ok(bytes) => bytes,
                    Err(_) => break, // endpoint closed
                };
                if let Ok(more) = endpoint.read() {
                    bytes.extend(more);
                }
                if stdout.write_all(&bytes).await.is_err() {
                    break;
                }
                let _ = stdout.flush().await;
            }
        })
    };

    // ── Stdin → bus ───────────────────────────────────────────────────────────
    let mut stdin = tokio::io::stdin();
    let mut buf = vec![0u8; 1024];
    loop {
        tokio::select! {
            read = stdin.read(&mut buf) => match read {
                Ok(0) => break, // EOF
                Ok(n) => {
                    if let Err(e) = endpoint.write(&buf[..n]) {
                        error!("write failed: {e}");
                        break;
                    }
                }
                Err(e) => {
                    error!("stdin read failed: {e}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    endpoint.close();
    let _ = inbound.await;
    info!("tunnel closed");
    Ok(())
}
