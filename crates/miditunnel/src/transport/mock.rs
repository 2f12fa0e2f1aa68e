//! In-memory event bus for unit and integration testing.
//!
//! The real transport backends talk to a system MIDI driver that:
//!
//! - requires OS MIDI services (ALSA, CoreMIDI, WinMM) to be present,
//! - delivers events on a driver-owned thread outside test control,
//! - cannot be observed directly from Rust test code.
//!
//! `MockTransport` replaces the driver with simple in-memory recording.
//! Every sent event is pushed into a shared log so assertions can inspect
//! exactly what was emitted and in what order, and tests can inject
//! inbound events with [`MockTransport::deliver`] from any thread, to
//! simulate the driver's delivery context.
//!
//! Two extras make end-to-end tests possible without a driver:
//!
//! - [`link`](MockTransport::link) loops an output port back into an input
//!   port, so two endpoints on the same mock bus can talk to each other.
//! - [`set_fail_sends`](MockTransport::set_fail_sends) makes every
//!   subsequent send fail, to exercise error-handling paths in callers.
//!
//! Input registrations are exclusive per port, mirroring the real bus: a
//! second `connect_input` on an occupied port is rejected.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use miditunnel_core::MidiEvent;

use crate::transport::{
    EventCallback, EventSink, InputConnection, MidiTransport, TransportError,
};

#[derive(Default)]
struct BusState {
    input_ports: Vec<String>,
    output_ports: Vec<String>,
    /// One exclusive receiver per input port: (registration id, callback).
    receivers: HashMap<String, (u64, EventCallback)>,
    /// Loopback routes: output port name → input port name.
    links: HashMap<String, String>,
    /// Every event sent through any output connection, in send order.
    sent: Vec<(String, MidiEvent)>,
    fail_sends: bool,
    next_registration_id: u64,
    active_outputs: usize,
}

/// An in-memory [`MidiTransport`] that records sends and lets tests inject
/// deliveries.
#[derive(Default)]
pub struct MockTransport {
    state: Arc<Mutex<BusState>>,
}

impl MockTransport {
    /// Creates a bus with no ports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus with the given input and output port names.
    pub fn with_ports(inputs: &[&str], outputs: &[&str]) -> Self {
        let transport = Self::new();
        {
            let mut state = transport.state.lock().unwrap();
            state.input_ports = inputs.iter().map(|s| s.to_string()).collect();
            state.output_ports = outputs.iter().map(|s| s.to_string()).collect();
        }
        transport
    }

    /// Adds an input port to the bus.
    pub fn add_input_port(&self, name: &str) {
        self.state.lock().unwrap().input_ports.push(name.to_string());
    }

    /// Adds an output port to the bus.
    pub fn add_output_port(&self, name: &str) {
        self.state.lock().unwrap().output_ports.push(name.to_string());
    }

    /// Routes every event sent on `output_port` into the receiver
    /// registered on `input_port`, so endpoints can round-trip in-process.
    pub fn link(&self, output_port: &str, input_port: &str) {
        self.state
            .lock()
            .unwrap()
            .links
            .insert(output_port.to_string(), input_port.to_string());
    }

    /// Injects one inbound event, invoking the receiver registered on
    /// `input_port` the way the driver's delivery thread would.
    ///
    /// Returns `true` if a receiver consumed the event, `false` if the
    /// port has no registration.
    pub fn deliver(&self, input_port: &str, event: MidiEvent) -> bool {
        let state = self.state.lock().unwrap();
        match state.receivers.get(input_port) {
            Some((_, receiver)) => {
                receiver(event);
                true
            }
            None => false,
        }
    }

    /// Snapshot of every event sent so far, as (output port, event) pairs.
    pub fn sent_events(&self) -> Vec<(String, MidiEvent)> {
        self.state.lock().unwrap().sent.clone()
    }

    /// When `true`, every subsequent send fails with
    /// [`TransportError::SendFailed`].
    pub fn set_fail_sends(&self, fail: bool) {
        self.state.lock().unwrap().fail_sends = fail;
    }

    /// Number of live input registrations.
    pub fn active_input_count(&self) -> usize {
        self.state.lock().unwrap().receivers.len()
    }

    /// Number of live output registrations.
    pub fn active_output_count(&self) -> usize {
        self.state.lock().unwrap().active_outputs
    }
}

impl MidiTransport for MockTransport {
    fn input_ports(&self) -> Vec<String> {
        self.state.lock().unwrap().input_ports.clone()
    }

    fn output_ports(&self) -> Vec<String> {
        self.state.lock().unwrap().output_ports.clone()
    }

    fn connect_input(
        &self,
        port_name: &str,
        tag: &str,
        receiver: EventCallback,
    ) -> Result<Box<dyn InputConnection>, TransportError> {
        let mut state = self.state.lock().unwrap();
        if !state.input_ports.iter().any(|p| p == port_name) {
            return Err(TransportError::UnknownInputPort(port_name.to_string()));
        }
        if state.receivers.contains_key(port_name) {
            return Err(TransportError::Registration {
                port: port_name.to_string(),
                reason: format!("port already registered (tag {tag} rejected)"),
            });
        }

        let id = state.next_registration_id;
        state.next_registration_id += 1;
        state.receivers.insert(port_name.to_string(), (id, receiver));

        Ok(Box::new(MockInputConnection {
            port_name: port_name.to_string(),
            registration_id: id,
            state: Arc::clone(&self.state),
        }))
    }

    fn connect_output(
        &self,
        port_name: &str,
        _tag: &str,
    ) -> Result<Box<dyn EventSink>, TransportError> {
        let mut state = self.state.lock().unwrap();
        if !state.output_ports.iter().any(|p| p == port_name) {
            return Err(TransportError::UnknownOutputPort(port_name.to_string()));
        }
        state.active_outputs += 1;

        Ok(Box::new(MockOutputSink {
            port_name: port_name.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

// ── Connection handles ────────────────────────────────────────────────────────

struct MockInputConnection {
    port_name: String,
    registration_id: u64,
    state: Arc<Mutex<BusState>>,
}

impl InputConnection for MockInputConnection {
    fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl Drop for MockInputConnection {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        // Only remove our own registration; a later registration on the
        // same port (after this handle was leaked past close) must survive.
        if let Some((id, _)) = state.receivers.get(&self.port_name) {
            if *id == self.registration_id {
                state.receivers.remove(&self.port_name);
            }
        }
    }
}

struct MockOutputSink {
    port_name: String,
    state: Arc<Mutex<BusState>>,
}

impl EventSink for MockOutputSink {
    fn send(&self, event: &MidiEvent) -> Result<(), TransportError> {
        let state = &mut *self.state.lock().unwrap();
        if state.fail_sends {
            return Err(TransportError::SendFailed {
                reason: format!("mock failure on port {}", self.port_name),
            });
        }
        state.sent.push((self.port_name.clone(), *event));

        // Loopback: hand the event to the linked input's receiver, still
        // on the sender's thread (the mock's stand-in for the driver's
        // delivery context).
        if let Some(input_port) = state.links.get(&self.port_name) {
            if let Some((_, receiver)) = state.receivers.get(input_port) {
                receiver(*event);
            }
        }
        Ok(())
    }
}

impl Drop for MockOutputSink {
    fn drop(&mut self) {
        self.state.lock().unwrap().active_outputs -= 1;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
