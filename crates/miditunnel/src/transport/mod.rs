//! The event-bus seam: port discovery, connection registration, event
//! delivery, and event send.
//!
//! The tunnel core never talks to a MIDI driver directly. It goes through
//! the [`MidiTransport`] trait, which models the four capabilities the bus
//! must supply:
//!
//! - enumerate ports by human-readable name,
//! - register an input connection that invokes a callback once per
//!   received event, asynchronously, on the bus's own delivery context,
//! - register an output connection usable as an event sink,
//! - send one event through an output connection.
//!
//! Implementations: [`mock::MockTransport`] (in-memory, for tests) and,
//! behind the `midir-backend` feature, [`midir_backend::MidirTransport`]
//! (the system MIDI stack).

use miditunnel_core::MidiEvent;
use thiserror::Error;

pub mod mock;

#[cfg(feature = "midir-backend")]
pub mod midir_backend;

/// Callback invoked once per received event, on the transport's delivery
/// thread. Must do minimal, non-blocking work.
pub type EventCallback = Box<dyn Fn(MidiEvent) + Send + 'static>;

/// Errors surfaced by transport implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No input port with the given name exists on the bus.
    #[error("unknown input port: {0}")]
    UnknownInputPort(String),

    /// No output port with the given name exists on the bus.
    #[error("unknown output port: {0}")]
    UnknownOutputPort(String),

    /// The bus rejected registering a connection on a resolved port.
    #[error("registration rejected on port {port}: {reason}")]
    Registration { port: String, reason: String },

    /// An event could not be delivered to the output connection.
    #[error("event send failed: {reason}")]
    SendFailed { reason: String },

    /// The underlying driver failed outside any specific port operation.
    #[error("transport backend error: {0}")]
    Backend(String),
}

/// A concrete event bus the tunnel can bind to.
pub trait MidiTransport: Send + Sync {
    /// Names of the input ports currently visible on the bus.
    fn input_ports(&self) -> Vec<String>;

    /// Names of the output ports currently visible on the bus.
    fn output_ports(&self) -> Vec<String>;

    /// Resolves `port_name`, registers an input connection under `tag`,
    /// and subscribes `receiver` to its events.
    ///
    /// The returned handle keeps the registration alive; dropping it
    /// releases the registration and stops deliveries.
    ///
    /// # Errors
    ///
    /// [`TransportError::UnknownInputPort`] if no port matches,
    /// [`TransportError::Registration`] if the bus rejects the connection.
    fn connect_input(
        &self,
        port_name: &str,
        tag: &str,
        receiver: EventCallback,
    ) -> Result<Box<dyn InputConnection>, TransportError>;

    /// Resolves `port_name` and registers an output connection under `tag`.
    ///
    /// # Errors
    ///
    /// [`TransportError::UnknownOutputPort`] if no port matches,
    /// [`TransportError::Registration`] if the bus rejects the connection.
    fn connect_output(
        &self,
        port_name: &str,
        tag: &str,
    ) -> Result<Box<dyn EventSink>, TransportError>;
}

/// A live input registration. Dropping the handle deregisters it.
pub trait InputConnection: Send {
    /// Name of the port this connection is subscribed to.
    fn port_name(&self) -> &str;
}

/// A live output registration that can emit events onto the bus.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    /// Attempts delivery of one event.
    ///
    /// # Errors
    ///
    /// [`TransportError::SendFailed`] if the connection is not ready or the
    /// driver rejects the message.
    fn send(&self, event: &MidiEvent) -> Result<(), TransportError>;
}
