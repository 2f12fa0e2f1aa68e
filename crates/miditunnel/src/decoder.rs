//! The inbound half: turning delivered events back into queued bytes.

use std::sync::Weak;

use tracing::trace;

use miditunnel_core::{decode_event, MidiEvent};

use crate::queue::ByteQueue;

/// The transport's delivery callback target.
///
/// Runs on the delivery thread the crate does not control, so
/// [`on_event`](Decoder::on_event) does minimal, non-blocking work: decode
/// one event, append at most one byte. Events that are not tunnel data are
/// discarded silently: the bus is shared with other traffic, and an
/// unmatched event is not an error.
///
/// The decoder holds a [`Weak`] reference to its queue. A delivery that
/// races with endpoint teardown must not extend the endpoint's lifetime;
/// once the queue is gone the event is dropped.
pub struct Decoder {
    queue: Weak<ByteQueue>,
}

impl Decoder {
    /// Binds a decoder to the queue it reassembles bytes into.
    pub fn new(queue: Weak<ByteQueue>) -> Self {
        Self { queue }
    }

    /// Handles one delivered event. Never fails, never panics.
    pub fn on_event(&self, event: &MidiEvent) {
        let Some(queue) = self.queue.upgrade() else {
            trace!("event delivered after endpoint teardown, dropping");
            return;
        };

        match decode_event(event) {
            Some(byte) => queue.append(&[byte]),
            None => trace!(?event, "ignoring event outside the byte stream"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use miditunnel_core::{encode_byte, DATA_CONTROLLER};
    use std::sync::Arc;

    #[test]
    fn test_data_events_append_decoded_bytes_in_order() {
        let queue = Arc::new(ByteQueue::new());
        let decoder = Decoder::new(Arc::downgrade(&queue));

        decoder.on_event(&encode_byte(0x3C));
        decoder.on_event(&encode_byte(0xA1));

        assert_eq!(queue.take_available(), vec![0x3C, 0xA1]);
    }

    #[test]
    fn test_non_matching_events_leave_queue_unchanged() {
        let queue = Arc::new(ByteQueue::new());
        let decoder = Decoder::new(Arc::downgrade(&queue));

        decoder.on_event(&MidiEvent::NoteOn {
            channel: 0,
            key: 60,
            velocity: 100,
        });
        decoder.on_event(&MidiEvent::ControlChange {
            channel: 0,
            controller: DATA_CONTROLLER + 1,
            value: 5,
        });
        decoder.on_event(&MidiEvent::PitchBend {
            channel: 3,
            value: 8192,
        });

        assert!(queue.is_empty());
    }

    #[test]
    fn test_event_after_queue_dropped_is_ignored() {
        let queue = Arc::new(ByteQueue::new());
        let decoder = Decoder::new(Arc::downgrade(&queue));
        drop(queue);

        // Must neither panic nor resurrect the queue.
        decoder.on_event(&encode_byte(0x42));
    }

    #[test]
    fn test_decoder_does_not_keep_queue_alive() {
        let queue = Arc::new(ByteQueue::new());
        let _decoder = Decoder::new(Arc::downgrade(&queue));

        assert_eq!(Arc::strong_count(&queue), 1);
        drop(queue);
    }
}
