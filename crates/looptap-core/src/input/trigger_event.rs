//! Cross-thread onset signal
//!
//! One `TriggerEvent` is shared (via `Arc`) between the detector, which fires
//! it from the audio thread, and whoever acts on it. The fired flag is
//! consume-once: `consume()` clears it with a compare-and-swap, so exactly one
//! caller observes each onset.
//!
//! Position fields are written before the flag is raised (Release) and read
//! after it is observed (Acquire), so a consumer that wins `consume()` sees
//! the positions belonging to that onset.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};

/// Sentinel stored in position fields while no onset is recorded
const UNSET: i64 = -1;

/// Stereo channel an onset was detected on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerChannel {
    #[default]
    Left,
    Right,
}

impl TriggerChannel {
    fn from_u8(value: u8) -> Self {
        if value == 1 {
            TriggerChannel::Right
        } else {
            TriggerChannel::Left
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            TriggerChannel::Left => 0,
            TriggerChannel::Right => 1,
        }
    }
}

/// Atomic onset event, fired by the detector and consumed once
#[derive(Debug)]
pub struct TriggerEvent {
    fired: AtomicBool,
    /// Offset of the onset within the block it was detected in
    sample_in_block: AtomicI64,
    /// Position on the detector's running sample clock
    absolute_index: AtomicI64,
    channel: AtomicU8,
}

impl TriggerEvent {
    pub fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
            sample_in_block: AtomicI64::new(UNSET),
            absolute_index: AtomicI64::new(UNSET),
            channel: AtomicU8::new(0),
        }
    }

    /// Record an onset and raise the fired flag
    pub fn fire(&self, sample_in_block: usize, absolute_index: u64, channel: TriggerChannel) {
        self.sample_in_block
            .store(sample_in_block as i64, Ordering::Relaxed);
        self.absolute_index
            .store(absolute_index as i64, Ordering::Relaxed);
        self.channel.store(channel.as_u8(), Ordering::Relaxed);
        self.fired.store(true, Ordering::Release);
    }

    /// Clear the fired flag if it is set
    ///
    /// Returns true exactly once per `fire()`; concurrent callers race on a
    /// compare-and-swap and only one of them wins.
    pub fn consume(&self) -> bool {
        self.fired
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[inline]
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Drop any pending onset and unset the positions
    pub fn reset(&self) {
        self.fired.store(false, Ordering::Release);
        self.sample_in_block.store(UNSET, Ordering::Relaxed);
        self.absolute_index.store(UNSET, Ordering::Relaxed);
        self.channel.store(0, Ordering::Relaxed);
    }

    pub fn sample_in_block(&self) -> Option<usize> {
        let value = self.sample_in_block.load(Ordering::Relaxed);
        (value >= 0).then_some(value as usize)
    }

    pub fn absolute_index(&self) -> Option<u64> {
        let value = self.absolute_index.load(Ordering::Relaxed);
        (value >= 0).then_some(value as u64)
    }

    pub fn channel(&self) -> TriggerChannel {
        TriggerChannel::from_u8(self.channel.load(Ordering::Relaxed))
    }
}

impl Default for TriggerEvent {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_event_is_unset() {
        let event = TriggerEvent::new();
        assert!(!event.is_fired());
        assert_eq!(event.sample_in_block(), None);
        assert_eq!(event.absolute_index(), None);
        assert!(!event.consume());
    }

    #[test]
    fn test_consume_once_per_fire() {
        let event = TriggerEvent::new();
        event.fire(12, 4108, TriggerChannel::Right);

        assert!(event.is_fired());
        assert!(event.consume());
        assert!(!event.consume());
        assert!(!event.is_fired());

        // Positions survive consumption until the next reset
        assert_eq!(event.sample_in_block(), Some(12));
        assert_eq!(event.absolute_index(), Some(4108));
        assert_eq!(event.channel(), TriggerChannel::Right);

        event.fire(0, 9000, TriggerChannel::Left);
        assert!(event.consume());
        assert!(!event.consume());
    }

    #[test]
    fn test_reset_clears_pending_onset() {
        let event = TriggerEvent::new();
        event.fire(3, 3, TriggerChannel::Left);
        event.reset();

        assert!(!event.consume());
        assert_eq!(event.absolute_index(), None);
    }

    #[test]
    fn test_single_winner_across_threads() {
        let event = Arc::new(TriggerEvent::new());
        event.fire(0, 0, TriggerChannel::Left);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let event = Arc::clone(&event);
                std::thread::spawn(move || event.consume())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
