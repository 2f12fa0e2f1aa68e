//! The outbound half: serializing bytes into control-change events.

use miditunnel_core::protocol::codec;

use crate::transport::{EventSink, TransportError};

/// Serializes outgoing bytes into data events and hands them to the bound
/// output connection, strictly in byte order.
///
/// The encoder performs no buffering of its own: each [`write`](Encoder::write)
/// either fully sends the given bytes or stops at and reports the first
/// send failure.
pub struct Encoder {
    sink: Box<dyn EventSink>,
}

impl Encoder {
    /// Binds an encoder to an output connection.
    pub fn new(sink: Box<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Encodes and sends every byte of `bytes`, one event per byte.
    ///
    /// # Errors
    ///
    /// Propagates the first [`TransportError`] from the sink. Bytes before
    /// the failing one have already been emitted; none after it are sent.
    pub fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        for &byte in bytes {
            self.sink.send(&codec::encode_byte(byte))?;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
