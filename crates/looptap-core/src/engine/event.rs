//! Notifications from the audio thread
//!
//! The engine reports state transitions through a lock-free SPSC queue that
//! the control thread drains at its own pace. The audio thread never blocks
//! on it: when the queue is full, new events are dropped.

use crate::types::TrackId;

/// Capacity of the event queue
///
/// A burst is at most a few events per track per block; 64 covers a full
/// sequential hand-off on every slot with room to spare.
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Engine-to-control notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LooperEvent {
    RecordingStarted(TrackId),
    RecordingStopped(TrackId),
    /// The first completed take fixed the loop length
    MasterLoopSet { track: TrackId, length: usize },
    /// An onset was detected but no track was armed
    TriggerIgnored { absolute_index: u64 },
}

/// Create a new event channel (producer/consumer pair)
pub fn event_channel() -> (rtrb::Producer<LooperEvent>, EventReceiver) {
    let (tx, rx) = rtrb::RingBuffer::new(EVENT_QUEUE_CAPACITY);
    (tx, EventReceiver { consumer: rx })
}

/// Control-thread side of the event queue
pub struct EventReceiver {
    consumer: rtrb::Consumer<LooperEvent>,
}

impl EventReceiver {
    /// Pop one pending event, if any (non-blocking)
    pub fn try_recv(&mut self) -> Option<LooperEvent> {
        self.consumer.pop().ok()
    }

    /// Iterate over all currently pending events
    pub fn drain(&mut self) -> impl Iterator<Item = LooperEvent> + '_ {
        std::iter::from_fn(move || self.try_recv())
    }

    /// Number of pending events
    pub fn pending(&self) -> usize {
        self.consumer.slots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (mut tx, mut rx) = event_channel();
        tx.push(LooperEvent::RecordingStarted(TrackId(1))).unwrap();
        tx.push(LooperEvent::RecordingStopped(TrackId(1))).unwrap();

        assert_eq!(rx.pending(), 2);
        let events: Vec<_> = rx.drain().collect();
        assert_eq!(
            events,
            vec![
                LooperEvent::RecordingStarted(TrackId(1)),
                LooperEvent::RecordingStopped(TrackId(1)),
            ]
        );
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_full_queue_rejects_push() {
        let (mut tx, _rx) = event_channel();
        for _ in 0..EVENT_QUEUE_CAPACITY {
            tx.push(LooperEvent::TriggerIgnored { absolute_index: 0 }).unwrap();
        }
        assert!(tx.push(LooperEvent::TriggerIgnored { absolute_index: 1 }).is_err());
    }
}
