//! The public byte-channel object: one encoder, one decoder, one queue,
//! bound to one input and one output port on the bus.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::TunnelConfig;
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::queue::ByteQueue;
use crate::transport::{InputConnection, MidiTransport, TransportError};

/// Errors surfaced by endpoint operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TunnelError {
    /// The underlying transport failed (port resolution, registration, or
    /// event send).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The endpoint was closed; also resolves any read that was pending at
    /// the moment of [`TunnelEndpoint::close`].
    #[error("endpoint is closed")]
    Closed,
}

/// A duplex byte channel over the event bus.
///
/// An endpoint is *open* from successful construction until
/// [`close`](Self::close); construction either fully succeeds or fails
/// atomically, leaving no registration behind. After close every operation
/// fails with [`TunnelError::Closed`].
///
/// At most one endpoint binds a given (input port, output port) pair at a
/// time, since the underlying bus registers input ports exclusively.
///
/// Writes are delivered to the bus in call order; a single writer per
/// endpoint is assumed, concurrent writers must serialize among
/// themselves. Reads observe bytes in event-arrival order. Ordering and
/// reliability beyond that are inherited from the bus: the tunnel adds no
/// sequence numbers, acknowledgements, or retries.
pub struct TunnelEndpoint {
    id: Uuid,
    queue: Arc<ByteQueue>,
    encoder: Encoder,
    input: Mutex<Option<Box<dyn InputConnection>>>,
    closed: AtomicBool,
}

impl TunnelEndpoint {
    /// Opens an endpoint reading events from `input_port` and sending
    /// events to `output_port`.
    ///
    /// # Errors
    ///
    /// Fails with [`TunnelError::Transport`] if either port cannot be
    /// resolved or a registration is rejected. If the output registration
    /// fails, the input registration made just before it is torn down;
    /// an endpoint is never left half-open.
    pub fn connect(
        transport: &dyn MidiTransport,
        input_port: &str,
        output_port: &str,
    ) -> Result<Self, TunnelError> {
        Self::connect_with_tag(transport, input_port, output_port, "miditunnel")
    }

    /// Like [`connect`](Self::connect), with a caller-chosen registration
    /// tag prefix.
    pub fn connect_with_tag(
        transport: &dyn MidiTransport,
        input_port: &str,
        output_port: &str,
        tag: &str,
    ) -> Result<Self, TunnelError> {
        let id = Uuid::new_v4();
        let queue = Arc::new(ByteQueue::new());
        let decoder = Decoder::new(Arc::downgrade(&queue));

        let input = transport.connect_input(
            input_port,
            &format!("{tag}-in-{id}"),
            Box::new(move |event| decoder.on_event(&event)),
        )?;

        // A failure here drops `input`, releasing its registration:
        // construction leaves nothing behind on error.
        let sink = transport.connect_output(output_port, &format!("{tag}-out-{id}"))?;

        debug!(%id, input_port, output_port, "tunnel endpoint open");
        Ok(Self {
            id,
            queue,
            encoder: Encoder::new(sink),
            input: Mutex::new(Some(input)),
            closed: AtomicBool::new(false),
        })
    }

    /// Opens an endpoint using the port names and tag from `config`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`connect`](Self::connect).
    pub fn from_config(
        transport: &dyn MidiTransport,
        config: &TunnelConfig,
    ) -> Result<Self, TunnelError> {
        Self::connect_with_tag(
            transport,
            &config.input_port,
            &config.output_port,
            &config.connection_tag,
        )
    }

    /// Returns whatever bytes are currently available without waiting.
    ///
    /// An empty result means nothing has arrived; it is not an error.
    ///
    /// # Errors
    ///
    /// [`TunnelError::Closed`] after [`close`](Self::close).
    pub fn read(&self) -> Result<Vec<u8>, TunnelError> {
        self.ensure_open()?;
        Ok(self.queue.take_available())
    }

    /// Waits until exactly `n` bytes are available and returns them,
    /// leaving any surplus queued for the next read.
    ///
    /// The wait is cooperative and never blocks a thread the delivery path
    /// depends on.
    ///
    /// # Errors
    ///
    /// [`TunnelError::Closed`] if the endpoint is closed, including while
    /// the wait is pending: a cancelled wait resolves with this error
    /// rather than hanging or short-reading.
    pub async fn read_exact(&self, n: usize) -> Result<Vec<u8>, TunnelError> {
        self.ensure_open()?;
        self.queue
            .take_exactly(n)
            .await
            .map_err(|_| TunnelError::Closed)
    }

    /// Encodes `bytes` and sends them to the output port, in order.
    ///
    /// # Errors
    ///
    /// [`TunnelError::Closed`] after close; [`TunnelError::Transport`] if
    /// the bus rejects a send. A failed write does not corrupt the inbound
    /// queue or invalidate the endpoint, and a later write may succeed.
    pub fn write(&self, bytes: &[u8]) -> Result<(), TunnelError> {
        self.ensure_open()?;
        Ok(self.encoder.write(bytes)?)
    }

    /// Closes the endpoint: cancels pending reads, releases the input
    /// registration, and fails all subsequent operations. Idempotent.
    ///
    /// In-flight events are not flushed; delivery of already-sent events
    /// is the bus's concern.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.queue.close();
        if let Some(input) = self.input.lock().unwrap().take() {
            debug!(id = %self.id, port = input.port_name(), "released input registration");
        }
        debug!(id = %self.id, "tunnel endpoint closed");
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), TunnelError> {
        if self.is_closed() {
            Err(TunnelError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Drop for TunnelEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use miditunnel_core::encode_byte;

    fn open_loopback() -> (MockTransport, TunnelEndpoint) {
        let bus = MockTransport::with_ports(&["in"], &["out"]);
        bus.link("out", "in");
        let endpoint = TunnelEndpoint::connect(&bus, "in", "out").unwrap();
        (bus, endpoint)
    }

    #[test]
    fn test_connect_fails_on_unknown_input_port() {
        let bus = MockTransport::with_ports(&[], &["out"]);
        let result = TunnelEndpoint::connect(&bus, "missing", "out");
        assert!(matches!(
            result.err(),
            Some(TunnelError::Transport(TransportError::UnknownInputPort(_)))
        ));
    }

    #[test]
    fn test_connect_fails_on_unknown_output_port() {
        let bus = MockTransport::with_ports(&["in"], &[]);
        let result = TunnelEndpoint::connect(&bus, "in", "missing");
        assert!(matches!(
            result.err(),
            Some(TunnelError::Transport(TransportError::UnknownOutputPort(_)))
        ));
    }

    #[test]
    fn test_failed_output_registration_tears_down_input_registration() {
        let bus = MockTransport::with_ports(&["in"], &[]);
        let _ = TunnelEndpoint::connect(&bus, "in", "missing");
        assert_eq!(
            bus.active_input_count(),
            0,
            "no registration may survive a failed construction"
        );
    }

    #[test]
    fn test_read_on_idle_endpoint_returns_empty() {
        let (_bus, endpoint) = open_loopback();
        assert_eq!(endpoint.read().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_write_emits_expected_events() {
        let (bus, endpoint) = open_loopback();
        endpoint.write(&[0x3C, 0xA1]).unwrap();

        let events: Vec<_> = bus.sent_events().into_iter().map(|(_, e)| e).collect();
        assert_eq!(events, vec![encode_byte(0x3C), encode_byte(0xA1)]);
    }

    #[tokio::test]
    async fn test_loopback_round_trip() {
        let (_bus, endpoint) = open_loopback();
        endpoint.write(&[0x3C, 0xA1]).unwrap();
        assert_eq!(endpoint.read_exact(2).await.unwrap(), vec![0x3C, 0xA1]);
    }

    #[test]
    fn test_failed_write_does_not_invalidate_endpoint() {
        let (bus, endpoint) = open_loopback();

        bus.set_fail_sends(true);
        assert!(matches!(
            endpoint.write(&[1]),
            Err(TunnelError::Transport(TransportError::SendFailed { .. }))
        ));

        bus.set_fail_sends(false);
        endpoint.write(&[2]).unwrap();
    }

    #[test]
    fn test_operations_after_close_fail_with_closed() {
        let (_bus, endpoint) = open_loopback();
        endpoint.close();

        assert!(matches!(endpoint.read(), Err(TunnelError::Closed)));
        assert!(matches!(endpoint.write(&[1]), Err(TunnelError::Closed)));
    }

    #[tokio::test]
    async fn test_read_exact_after_close_fails_with_closed() {
        let (_bus, endpoint) = open_loopback();
        endpoint.close();
        assert!(matches!(
            endpoint.read_exact(1).await,
            Err(TunnelError::Closed)
        ));
    }

    #[test]
    fn test_close_releases_input_registration_and_is_idempotent() {
        let (bus, endpoint) = open_loopback();
        assert_eq!(bus.active_input_count(), 1);

        endpoint.close();
        endpoint.close();
        assert_eq!(bus.active_input_count(), 0);
    }

    #[test]
    fn test_drop_releases_input_registration() {
        let (bus, endpoint) = open_loopback();
        drop(endpoint);
        assert_eq!(bus.active_input_count(), 0);
    }

    #[test]
    fn test_second_endpoint_on_same_input_port_is_rejected() {
        let (bus, _endpoint) = open_loopback();
        let second = TunnelEndpoint::connect(&bus, "in", "out");
        assert!(matches!(
            second.err(),
            Some(TunnelError::Transport(TransportError::Registration { .. }))
        ));
    }

    #[test]
    fn test_from_config_uses_configured_ports() {
        let bus = MockTransport::with_ports(&["cfg.in"], &["cfg.out"]);
        let config = TunnelConfig::new("cfg.in", "cfg.out");
        let endpoint = TunnelEndpoint::from_config(&bus, &config).unwrap();
        assert!(!endpoint.is_closed());
    }
}
