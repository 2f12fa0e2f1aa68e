//! Typed MIDI channel-voice events and their raw wire encoding.
//!
//! Wire format (serial MIDI):
//! ```text
//! [status:1][data1:1][data2:0..1]
//! ```
//! The status byte has its high bit set (`0x80..=0xFF`); the high nibble
//! selects the message kind and the low nibble carries the channel (0–15).
//! Data bytes always have the high bit clear (`0x00..=0x7F`).
//!
//! Only channel-voice messages are modelled here. System messages (status
//! `0xF0..`) and running status are not part of this protocol's traffic and
//! are rejected by [`MidiEvent::parse`]; the transport layer drops them.

use thiserror::Error;

/// Errors that can occur while parsing a raw MIDI message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    /// The input buffer was empty.
    #[error("empty buffer, expected a MIDI status byte")]
    Empty,

    /// The buffer ended before the message's data bytes.
    #[error("truncated message: need {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// The first byte does not have the status high bit set.
    #[error("not a status byte: 0x{0:02X}")]
    NotAStatusByte(u8),

    /// The status nibble is a message kind this protocol does not carry
    /// (polyphonic aftertouch, system messages).
    #[error("unsupported status byte: 0x{0:02X}")]
    UnsupportedStatus(u8),

    /// A data byte had its high bit set.
    #[error("invalid data byte: 0x{0:02X}")]
    InvalidDataByte(u8),
}

/// A typed MIDI channel-voice event.
///
/// All `channel` fields are 0–15 and all 7-bit data fields are 0–127;
/// [`to_bytes`](MidiEvent::to_bytes) masks out-of-range values rather than
/// producing an invalid wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    /// Note released (`0x8n`).
    NoteOff { channel: u8, key: u8, velocity: u8 },
    /// Note pressed (`0x9n`).
    NoteOn { channel: u8, key: u8, velocity: u8 },
    /// Controller moved (`0xBn`). This is the only event kind the tunnel's
    /// byte stream travels on.
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Patch selected (`0xCn`).
    ProgramChange { channel: u8, program: u8 },
    /// Channel pressure (`0xDn`).
    ChannelAftertouch { channel: u8, pressure: u8 },
    /// Pitch wheel (`0xEn`), 14-bit value 0–16383, centre 8192.
    PitchBend { channel: u8, value: u16 },
}

// ── Status nibbles ────────────────────────────────────────────────────────────

const STATUS_NOTE_OFF: u8 = 0x80;
const STATUS_NOTE_ON: u8 = 0x90;
const STATUS_CONTROL_CHANGE: u8 = 0xB0;
const STATUS_PROGRAM_CHANGE: u8 = 0xC0;
const STATUS_CHANNEL_AFTERTOUCH: u8 = 0xD0;
const STATUS_PITCH_BEND: u8 = 0xE0;

impl MidiEvent {
    /// Returns the wire status byte: message-kind high nibble | channel.
    pub fn status_byte(&self) -> u8 {
        let (kind, channel) = match self {
            MidiEvent::NoteOff { channel, .. } => (STATUS_NOTE_OFF, *channel),
            MidiEvent::NoteOn { channel, .. } => (STATUS_NOTE_ON, *channel),
            MidiEvent::ControlChange { channel, .. } => (STATUS_CONTROL_CHANGE, *channel),
            MidiEvent::ProgramChange { channel, .. } => (STATUS_PROGRAM_CHANGE, *channel),
            MidiEvent::ChannelAftertouch { channel, .. } => (STATUS_CHANNEL_AFTERTOUCH, *channel),
            MidiEvent::PitchBend { channel, .. } => (STATUS_PITCH_BEND, *channel),
        };
        kind | (channel & 0x0F)
    }

    /// Returns the channel this event addresses (0–15).
    pub fn channel(&self) -> u8 {
        match self {
            MidiEvent::NoteOff { channel, .. }
            | MidiEvent::NoteOn { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::ProgramChange { channel, .. }
            | MidiEvent::ChannelAftertouch { channel, .. }
            | MidiEvent::PitchBend { channel, .. } => channel & 0x0F,
        }
    }

    /// Encodes the event into its raw serial-MIDI bytes.
    ///
    /// 7-bit data fields are masked to `0x7F` and the pitch-bend value to
    /// 14 bits, so the output is always a valid wire message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use miditunnel_core::MidiEvent;
    ///
    /// let event = MidiEvent::ControlChange { channel: 0x0C, controller: 11, value: 0x03 };
    /// assert_eq!(event.to_bytes(), vec![0xBC, 11, 0x03]);
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(3);
        buf.push(self.status_byte());
        match self {
            MidiEvent::NoteOff { key, velocity, .. } | MidiEvent::NoteOn { key, velocity, .. } => {
                buf.push(key & 0x7F);
                buf.push(velocity & 0x7F);
            }
            MidiEvent::ControlChange { controller, value, .. } => {
                buf.push(controller & 0x7F);
                buf.push(value & 0x7F);
            }
            MidiEvent::ProgramChange { program, .. } => {
                buf.push(program & 0x7F);
            }
            MidiEvent::ChannelAftertouch { pressure, .. } => {
                buf.push(pressure & 0x7F);
            }
            MidiEvent::PitchBend { value, .. } => {
                let v = value & 0x3FFF;
                buf.push((v & 0x7F) as u8); // LSB first
                buf.push((v >> 7) as u8);
            }
        }
        buf
    }

    /// Decodes one event from the beginning of `bytes`.
    ///
    /// Returns the decoded event and the number of bytes consumed, so the
    /// caller can advance their read cursor over multi-message buffers.
    ///
    /// # Errors
    ///
    /// Returns [`EventParseError`] if the buffer is empty or truncated,
    /// does not start with a status byte (running status is not accepted),
    /// carries a message kind outside the channel-voice set handled here,
    /// or contains a data byte with the high bit set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use miditunnel_core::MidiEvent;
    ///
    /// let (event, consumed) = MidiEvent::parse(&[0x91, 60, 100]).unwrap();
    /// assert_eq!(event, MidiEvent::NoteOn { channel: 1, key: 60, velocity: 100 });
    /// assert_eq!(consumed, 3);
    /// ```
    pub fn parse(bytes: &[u8]) -> Result<(MidiEvent, usize), EventParseError> {
        let status = *bytes.first().ok_or(EventParseError::Empty)?;
        if status < 0x80 {
            return Err(EventParseError::NotAStatusByte(status));
        }

        let kind = status & 0xF0;
        let channel = status & 0x0F;
        let data_len = match kind {
            STATUS_NOTE_OFF | STATUS_NOTE_ON | STATUS_CONTROL_CHANGE | STATUS_PITCH_BEND => 2,
            STATUS_PROGRAM_CHANGE | STATUS_CHANNEL_AFTERTOUCH => 1,
            // 0xA0 polyphonic aftertouch and 0xF0 system messages
            _ => return Err(EventParseError::UnsupportedStatus(status)),
        };

        let needed = 1 + data_len;
        if bytes.len() < needed {
            return Err(EventParseError::Truncated {
                needed,
                available: bytes.len(),
            });
        }

        let d1 = data_byte(bytes[1])?;
        let event = match kind {
            STATUS_NOTE_OFF => MidiEvent::NoteOff {
                channel,
                key: d1,
                velocity: data_byte(bytes[2])?,
            },
            STATUS_NOTE_ON => MidiEvent::NoteOn {
                channel,
                key: d1,
                velocity: data_byte(bytes[2])?,
            },
            STATUS_CONTROL_CHANGE => MidiEvent::ControlChange {
                channel,
                controller: d1,
                value: data_byte(bytes[2])?,
            },
            STATUS_PROGRAM_CHANGE => MidiEvent::ProgramChange {
                channel,
                program: d1,
            },
            STATUS_CHANNEL_AFTERTOUCH => MidiEvent::ChannelAftertouch {
                channel,
                pressure: d1,
            },
            STATUS_PITCH_BEND => {
                let msb = data_byte(bytes[2])?;
                MidiEvent::PitchBend {
                    channel,
                    value: ((msb as u16) << 7) | d1 as u16,
                }
            }
            _ => unreachable!("kind checked above"),
        };

        Ok((event, needed))
    }
}

fn data_byte(b: u8) -> Result<u8, EventParseError> {
    if b < 0x80 {
        Ok(b)
    } else {
        Err(EventParseError::InvalidDataByte(b))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
