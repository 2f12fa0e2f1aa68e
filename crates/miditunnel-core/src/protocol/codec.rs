//! The data codec: mapping arbitrary bytes onto control-change events.
//!
//! Wire contract:
//! ```text
//! byte B  →  ControlChange { controller: DATA_CONTROLLER,
//!                            value:   B >> 4,      (high nibble, 0–15)
//!                            channel: B & 0x0F }   (low nibble,  0–15)
//! ```
//! Decoding reverses the mapping: `B = (value << 4) | channel`. Exactly one
//! event per byte, emitted in byte order. Any received event whose
//! controller differs from [`DATA_CONTROLLER`] (or that is not a
//! control-change at all) is not part of the byte stream and decodes to
//! `None`; it may be meaningful to other consumers of the same bus.
//!
//! Both fields use only 4 of their available bits so the mapping stays
//! symmetric and lossless for all 256 byte values.

use crate::protocol::events::MidiEvent;

/// The reserved controller number tagging data-carrying events.
///
/// Controller 11 is "expression" in ordinary MIDI usage, which keeps tunnel
/// traffic looking like routine instrument control.
pub const DATA_CONTROLLER: u8 = 11;

/// Splits a byte into its (high, low) nibbles, each in 0–15.
///
/// # Examples
///
/// ```rust
/// use miditunnel_core::split_byte;
///
/// assert_eq!(split_byte(0x3C), (0x3, 0xC));
/// ```
pub fn split_byte(byte: u8) -> (u8, u8) {
    (byte >> 4, byte & 0x0F)
}

/// Recombines (high, low) nibbles into a byte. Inverse of [`split_byte`].
pub fn join_nibbles(high: u8, low: u8) -> u8 {
    ((high & 0x0F) << 4) | (low & 0x0F)
}

/// Encodes one byte as its carrier control-change event.
///
/// # Examples
///
/// ```rust
/// use miditunnel_core::{encode_byte, MidiEvent, DATA_CONTROLLER};
///
/// let event = encode_byte(0xA1);
/// assert_eq!(
///     event,
///     MidiEvent::ControlChange { channel: 0x1, controller: DATA_CONTROLLER, value: 0xA }
/// );
/// ```
pub fn encode_byte(byte: u8) -> MidiEvent {
    let (high, low) = split_byte(byte);
    MidiEvent::ControlChange {
        channel: low,
        controller: DATA_CONTROLLER,
        value: high,
    }
}

/// Encodes a byte slice as one event per byte, preserving order.
pub fn encode_bytes(bytes: &[u8]) -> Vec<MidiEvent> {
    bytes.iter().copied().map(encode_byte).collect()
}

/// Decodes a received event back into a tunnel byte.
///
/// Returns `None` for every event that is not a control-change on
/// [`DATA_CONTROLLER`]; those are other traffic on the shared bus, not an
/// error. The value and channel fields are masked to 4 bits, mirroring the
/// encoder's range.
///
/// # Examples
///
/// ```rust
/// use miditunnel_core::{decode_event, MidiEvent, DATA_CONTROLLER};
///
/// let data = MidiEvent::ControlChange { channel: 0xC, controller: DATA_CONTROLLER, value: 0x3 };
/// assert_eq!(decode_event(&data), Some(0x3C));
///
/// let other = MidiEvent::NoteOn { channel: 0, key: 60, velocity: 100 };
/// assert_eq!(decode_event(&other), None);
/// ```
pub fn decode_event(event: &MidiEvent) -> Option<u8> {
    match event {
        MidiEvent::ControlChange {
            channel,
            controller,
            value,
        } if *controller == DATA_CONTROLLER => Some(join_nibbles(*value, *channel)),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_then_join_is_identity_for_all_bytes() {
        for byte in 0..=255u8 {
            let (high, low) = split_byte(byte);
            assert!(high <= 0x0F, "high nibble out of range for 0x{byte:02X}");
            assert!(low <= 0x0F, "low nibble out of range for 0x{byte:02X}");
            assert_eq!(join_nibbles(high, low), byte);
        }
    }

    #[test]
    fn test_encode_then_decode_is_identity_for_all_bytes() {
        for byte in 0..=255u8 {
            assert_eq!(decode_event(&encode_byte(byte)), Some(byte));
        }
    }

    #[test]
    fn test_encode_byte_places_high_nibble_in_value() {
        // 0x3C → value 0x3, channel 0xC
        let event = encode_byte(0x3C);
        assert_eq!(
            event,
            MidiEvent::ControlChange {
                channel: 0xC,
                controller: DATA_CONTROLLER,
                value: 0x3,
            }
        );
    }

    #[test]
    fn test_encode_bytes_preserves_order() {
        let events = encode_bytes(&[0x3C, 0xA1]);
        assert_eq!(
            events,
            vec![
                MidiEvent::ControlChange {
                    channel: 0xC,
                    controller: DATA_CONTROLLER,
                    value: 0x3,
                },
                MidiEvent::ControlChange {
                    channel: 0x1,
                    controller: DATA_CONTROLLER,
                    value: 0xA,
                },
            ]
        );
    }

    #[test]
    fn test_encode_bytes_of_empty_slice_is_empty() {
        assert!(encode_bytes(&[]).is_empty());
    }

    #[test]
    fn test_decode_ignores_other_controllers() {
        let event = MidiEvent::ControlChange {
            channel: 0,
            controller: DATA_CONTROLLER + 1,
            value: 0,
        };
        assert_eq!(decode_event(&event), None);
    }

    #[test]
    fn test_decode_ignores_non_control_change_events() {
        let events = [
            MidiEvent::NoteOn {
                channel: 0,
                key: 60,
                velocity: 100,
            },
            MidiEvent::NoteOff {
                channel: 0,
                key: 60,
                velocity: 0,
            },
            MidiEvent::ProgramChange {
                channel: 0,
                program: 1,
            },
            MidiEvent::ChannelAftertouch {
                channel: 0,
                pressure: 50,
            },
            MidiEvent::PitchBend {
                channel: 0,
                value: 8192,
            },
        ];
        for event in &events {
            assert_eq!(decode_event(event), None, "should ignore {event:?}");
        }
    }

    #[test]
    fn test_decode_masks_wide_fields_to_four_bits() {
        // A 7-bit carrier may deliver a wider value; only the low 4 bits of
        // each field belong to the byte.
        let event = MidiEvent::ControlChange {
            channel: 0x0C,
            controller: DATA_CONTROLLER,
            value: 0x73, // low nibble 0x3
        };
        assert_eq!(decode_event(&event), Some(0x3C));
    }
}
