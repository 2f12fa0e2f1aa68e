//! Real MIDI I/O through the system MIDI stack, via `midir`.
//!
//! Available behind the `midir-backend` feature. Each input connection
//! parses the driver's raw bytes into typed events with
//! [`MidiEvent::parse`]; messages that fail to parse (system exclusive,
//! running status, truncated packets) are dropped at trace level, since
//! they are other traffic on the bus rather than tunnel data.
//!
//! `midir` hands out one-shot client objects: a `MidiInput`/`MidiOutput`
//! instance is consumed when a connection is made. The transport therefore
//! creates a fresh client per operation, which also keeps port enumeration
//! current on buses where devices come and go.

use std::sync::Mutex;

use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::{debug, trace};

use miditunnel_core::MidiEvent;

use crate::transport::{
    EventCallback, EventSink, InputConnection, MidiTransport, TransportError,
};

/// A [`MidiTransport`] backed by the operating system's MIDI services.
pub struct MidirTransport {
    client_name: String,
}

impl MidirTransport {
    /// Creates a transport whose connections identify themselves to the OS
    /// under `client_name`.
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }
}

impl MidiTransport for MidirTransport {
    fn input_ports(&self) -> Vec<String> {
        match MidiInput::new(&self.client_name) {
            Ok(client) => client
                .ports()
                .iter()
                .filter_map(|port| client.port_name(port).ok())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn output_ports(&self) -> Vec<String> {
        match MidiOutput::new(&self.client_name) {
            Ok(client) => client
                .ports()
                .iter()
                .filter_map(|port| client.port_name(port).ok())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn connect_input(
        &self,
        port_name: &str,
        tag: &str,
        receiver: EventCallback,
    ) -> Result<Box<dyn InputConnection>, TransportError> {
        let client = MidiInput::new(&self.client_name)
            .map_err(|e| TransportError::Backend(e.to_string()))?;

        let port = client
            .ports()
            .into_iter()
            .find(|port| {
                client
                    .port_name(port)
                    .map(|name| name == port_name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| TransportError::UnknownInputPort(port_name.to_string()))?;

        let connection = client
            .connect(
                &port,
                tag,
                move |_timestamp, bytes, _| match MidiEvent::parse(bytes) {
                    Ok((event, _)) => receiver(event),
                    Err(err) => trace!(%err, "dropping unparseable MIDI message"),
                },
                (),
            )
            .map_err(|e| TransportError::Registration {
                port: port_name.to_string(),
                reason: e.to_string(),
            })?;

        debug!(port = port_name, tag, "midir input connection open");
        Ok(Box::new(MidirInputConnection {
            port_name: port_name.to_string(),
            connection: Some(connection),
        }))
    }

    fn connect_output(
        &self,
        port_name: &str,
        tag: &str,
    ) -> Result<Box<dyn EventSink>, TransportError> {
        let client = MidiOutput::new(&self.client_name)
            .map_err(|e| TransportError::Backend(e.to_string()))?;

        let port = client
            .ports()
            .into_iter()
            .find(|port| {
                client
                    .port_name(port)
                    .map(|name| name == port_name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| TransportError::UnknownOutputPort(port_name.to_string()))?;

        let connection = client
            .connect(&port, tag)
            .map_err(|e| TransportError::Registration {
                port: port_name.to_string(),
                reason: e.to_string(),
            })?;

        debug!(port = port_name, tag, "midir output connection open");
        Ok(Box::new(MidirOutputSink {
            port_name: port_name.to_string(),
            connection: Mutex::new(connection),
        }))
    }
}

// ── Connection handles ────────────────────────────────────────────────────────

struct MidirInputConnection {
    port_name: String,
    connection: Option<MidiInputConnection<()>>,
}

impl InputConnection for MidirInputConnection {
    fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl Drop for MidirInputConnection {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            debug!(port = %self.port_name, "midir input connection closed");
        }
    }
}

struct MidirOutputSink {
    port_name: String,
    // midir's send takes &mut; EventSink is shared.
    connection: Mutex<MidiOutputConnection>,
}

impl EventSink for MidirOutputSink {
    fn send(&self, event: &MidiEvent) -> Result<(), TransportError> {
        self.connection
            .lock()
            .unwrap()
            .send(&event.to_bytes())
            .map_err(|e| TransportError::SendFailed {
                reason: format!("port {}: {e}", self.port_name),
            })
    }
}
