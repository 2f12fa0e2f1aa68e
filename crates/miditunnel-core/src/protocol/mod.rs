//! Protocol module containing the MIDI event model and the data codec.

pub mod codec;
pub mod events;

pub use codec::{decode_event, encode_byte, encode_bytes, DATA_CONTROLLER};
pub use events::{EventParseError, MidiEvent};
