//! # miditunnel-core
//!
//! Shared protocol library for MIDI-Tunnel: the typed MIDI event model, the
//! raw serial-MIDI wire codec, and the nibble codec that maps arbitrary
//! bytes onto control-change events.
//!
//! This crate is used by the `miditunnel` endpoint crate and by transport
//! backends. It has zero dependencies on OS APIs, async runtimes, or MIDI
//! driver libraries.
//!
//! # How the tunnel carries bytes (overview)
//!
//! A MIDI bus moves discrete, typed events, not bytes. MIDI-Tunnel
//! disguises an ordinary byte stream as instrument-control traffic by
//! packing one byte into each control-change event:
//!
//! - **`protocol::events`** – The typed [`MidiEvent`] enum plus the raw
//!   wire encoding (status byte + data bytes) used when talking to a real
//!   MIDI driver.
//!
//! - **`protocol::codec`** – The data-channel mapping: each byte `B`
//!   becomes one control-change event on the reserved data controller with
//!   `value = B >> 4` and `channel = B & 0x0F`. Events carrying any other
//!   controller (or any other event type) are not part of the byte stream
//!   and decode to nothing.

pub mod protocol;

// Re-export the most-used items at the crate root so callers can write
// `miditunnel_core::MidiEvent` instead of the full module path.
pub use protocol::codec::{
    decode_event, encode_byte, encode_bytes, join_nibbles, split_byte, DATA_CONTROLLER,
};
pub use protocol::events::{EventParseError, MidiEvent};
