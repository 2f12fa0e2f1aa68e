//! # miditunnel
//!
//! An ordinary bidirectional byte-stream channel on top of a MIDI event
//! bus. The bus natively carries discrete, typed control events; this crate
//! disguises arbitrary application data as routine control-change traffic,
//! one byte per event.
//!
//! # Architecture
//!
//! ```text
//! write(bytes) ─▶ Encoder ─▶ EventSink ─▶ ····· event bus ·····
//!
//! ····· event bus ····· ─▶ delivery callback ─▶ Decoder ─▶ ByteQueue
//!                                                              │
//! read() / read_exact(n) ◀─────────────────────────────────────┘
//! ```
//!
//! The two halves reconcile mismatched concurrency models: the bus pushes
//! events asynchronously on a delivery thread the crate does not control,
//! while readers want to block until an arbitrary number of bytes is
//! available. The [`ByteQueue`] sits between them: the decoder appends
//! from the delivery thread, and [`TunnelEndpoint::read_exact`] waits
//! cooperatively (never blocking a thread the delivery path depends on)
//! until enough bytes have arrived.
//!
//! # Modules
//!
//! - **`queue`** – Thread-safe FIFO byte buffer with non-blocking append
//!   and both "take what's available" and "wait for exactly n" reads.
//! - **`encoder`** / **`decoder`** – The push-driven byte⇄event halves.
//! - **`endpoint`** – [`TunnelEndpoint`], the public byte-channel object
//!   bound to one input and one output port.
//! - **`transport`** – The event-bus seam: a [`transport::MidiTransport`]
//!   trait, an in-memory mock for tests, and an optional `midir`-backed
//!   real implementation (feature `midir-backend`).
//! - **`config`** – TOML configuration for port names and logging.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use miditunnel::transport::mock::MockTransport;
//! use miditunnel::TunnelEndpoint;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), miditunnel::TunnelError> {
//! let bus = Arc::new(MockTransport::with_ports(&["synth.out"], &["synth.in"]));
//! // Loop the output back to the input so the example is self-contained.
//! bus.link("synth.in", "synth.out");
//!
//! let endpoint = TunnelEndpoint::connect(bus.as_ref(), "synth.out", "synth.in")?;
//! endpoint.write(&[0x3C, 0xA1])?;
//! assert_eq!(endpoint.read_exact(2).await?, vec![0x3C, 0xA1]);
//! endpoint.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod endpoint;
pub mod queue;
pub mod transport;

// Re-export the public surface at the crate root.
pub use config::{ConfigError, TunnelConfig};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use endpoint::{TunnelEndpoint, TunnelError};
pub use queue::{ByteQueue, QueueError};
pub use transport::{EventSink, InputConnection, MidiTransport, TransportError};

// The event model and data codec come from miditunnel-core; re-export them
// so most callers only need this crate.
pub use miditunnel_core::{
    decode_event, encode_byte, encode_bytes, EventParseError, MidiEvent, DATA_CONTROLLER,
};
