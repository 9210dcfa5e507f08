//! Lock-free state mirrors for the control thread
//!
//! The audio thread publishes engine state here once per block; the control
//! thread reads it with relaxed loads. Values are snapshots, so a reader may
//! see fields from two adjacent blocks, which is fine for display and polling.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};

use crate::types::{TrackId, TrackState, MAX_TRACKS};

/// Stored in id/length fields that have no value
const NONE: u64 = u64::MAX;

/// Per-slot mirror
pub struct TrackAtomics {
    /// Track id occupying the slot, or NONE
    id: AtomicU64,
    state: AtomicU8,
    armed: AtomicBool,
    read_position: AtomicU64,
    write_position: AtomicU64,
    recorded_length: AtomicU64,
    final_length: AtomicU64,
}

impl TrackAtomics {
    fn new() -> Self {
        Self {
            id: AtomicU64::new(NONE),
            state: AtomicU8::new(TrackState::Idle.as_u8()),
            armed: AtomicBool::new(false),
            read_position: AtomicU64::new(0),
            write_position: AtomicU64::new(0),
            recorded_length: AtomicU64::new(0),
            final_length: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn id(&self) -> Option<TrackId> {
        match self.id.load(Ordering::Relaxed) {
            NONE => None,
            id => Some(TrackId(id as usize)),
        }
    }

    #[inline]
    pub fn state(&self) -> TrackState {
        TrackState::from_u8(self.state.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn read_position(&self) -> usize {
        self.read_position.load(Ordering::Relaxed) as usize
    }

    #[inline]
    pub fn write_position(&self) -> usize {
        self.write_position.load(Ordering::Relaxed) as usize
    }

    #[inline]
    pub fn recorded_length(&self) -> usize {
        self.recorded_length.load(Ordering::Relaxed) as usize
    }

    #[inline]
    pub fn final_length(&self) -> usize {
        self.final_length.load(Ordering::Relaxed) as usize
    }
}

/// Snapshot of one track, as published by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSnapshot {
    pub id: TrackId,
    pub state: TrackState,
    pub armed: bool,
    pub read_position: usize,
    pub write_position: usize,
    pub recorded_length: usize,
    pub final_length: usize,
}

/// Engine-wide mirror
pub struct LooperAtomics {
    pub tracks: [TrackAtomics; MAX_TRACKS],
    track_count: AtomicUsize,
    /// Per-track buffer capacity in samples
    capacity: AtomicU64,
    master_track: AtomicU64,
    master_length: AtomicU64,
    master_position: AtomicU64,
    queue_current: AtomicU64,
    queue_last: AtomicBool,
    /// Absolute position of the next block on the input clock
    absolute_position: AtomicU64,
    /// Peak of the last (gated) input block, f32 bits
    input_peak: AtomicU32,
    /// Current gate level, f32 bits
    gate_level: AtomicU32,
}

impl LooperAtomics {
    pub fn new() -> Self {
        Self {
            tracks: std::array::from_fn(|_| TrackAtomics::new()),
            track_count: AtomicUsize::new(0),
            capacity: AtomicU64::new(0),
            master_track: AtomicU64::new(NONE),
            master_length: AtomicU64::new(NONE),
            master_position: AtomicU64::new(0),
            queue_current: AtomicU64::new(NONE),
            queue_last: AtomicBool::new(false),
            absolute_position: AtomicU64::new(0),
            input_peak: AtomicU32::new(0),
            gate_level: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn track_count(&self) -> usize {
        self.track_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed) as usize
    }

    pub fn master_track(&self) -> Option<TrackId> {
        match self.master_track.load(Ordering::Relaxed) {
            NONE => None,
            id => Some(TrackId(id as usize)),
        }
    }

    pub fn master_length(&self) -> Option<usize> {
        match self.master_length.load(Ordering::Relaxed) {
            NONE => None,
            len => Some(len as usize),
        }
    }

    #[inline]
    pub fn master_position(&self) -> usize {
        self.master_position.load(Ordering::Relaxed) as usize
    }

    pub fn current_recording_track(&self) -> Option<TrackId> {
        match self.queue_current.load(Ordering::Relaxed) {
            NONE => None,
            id => Some(TrackId(id as usize)),
        }
    }

    #[inline]
    pub fn is_recording_active(&self) -> bool {
        self.current_recording_track().is_some()
    }

    #[inline]
    pub fn is_last_track_recording(&self) -> bool {
        self.queue_last.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn absolute_position(&self) -> u64 {
        self.absolute_position.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn input_peak(&self) -> f32 {
        f32::from_bits(self.input_peak.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn gate_level(&self) -> f32 {
        f32::from_bits(self.gate_level.load(Ordering::Relaxed))
    }

    /// Find the slot mirror holding `id`
    pub fn track(&self, id: TrackId) -> Option<&TrackAtomics> {
        self.tracks[..self.track_count().min(MAX_TRACKS)]
            .iter()
            .find(|t| t.id() == Some(id))
    }

    /// Copy out every occupied slot
    pub fn snapshot(&self) -> Vec<TrackSnapshot> {
        self.tracks[..self.track_count().min(MAX_TRACKS)]
            .iter()
            .filter_map(|t| {
                Some(TrackSnapshot {
                    id: t.id()?,
                    state: t.state(),
                    armed: t.is_armed(),
                    read_position: t.read_position(),
                    write_position: t.write_position(),
                    recorded_length: t.recorded_length(),
                    final_length: t.final_length(),
                })
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────
    // Writers (audio thread)
    // ─────────────────────────────────────────────────────────────

    pub(crate) fn store_track(&self, slot: usize, track: &super::track::Track) {
        let Some(a) = self.tracks.get(slot) else {
            return;
        };
        a.id.store(track.id().0 as u64, Ordering::Relaxed);
        a.state.store(track.state().as_u8(), Ordering::Relaxed);
        a.armed.store(track.is_armed(), Ordering::Relaxed);
        a.read_position
            .store(track.read_position() as u64, Ordering::Relaxed);
        a.write_position
            .store(track.write_position() as u64, Ordering::Relaxed);
        a.recorded_length
            .store(track.recorded_length() as u64, Ordering::Relaxed);
        a.final_length
            .store(track.final_length() as u64, Ordering::Relaxed);
    }

    pub(crate) fn store_track_count(&self, count: usize) {
        self.track_count.store(count, Ordering::Relaxed);
    }

    pub(crate) fn store_capacity(&self, capacity: usize) {
        self.capacity.store(capacity as u64, Ordering::Relaxed);
    }

    pub(crate) fn store_master(&self, track: Option<TrackId>, length: Option<usize>, position: usize) {
        self.master_track
            .store(track.map_or(NONE, |t| t.0 as u64), Ordering::Relaxed);
        self.master_length
            .store(length.map_or(NONE, |l| l as u64), Ordering::Relaxed);
        self.master_position
            .store(position as u64, Ordering::Relaxed);
    }

    pub(crate) fn store_queue(&self, current: Option<TrackId>, is_last: bool) {
        self.queue_current
            .store(current.map_or(NONE, |t| t.0 as u64), Ordering::Relaxed);
        self.queue_last.store(is_last, Ordering::Relaxed);
    }

    pub(crate) fn store_levels(&self, absolute_position: u64, input_peak: f32, gate_level: f32) {
        self.absolute_position
            .store(absolute_position, Ordering::Relaxed);
        self.input_peak
            .store(input_peak.to_bits(), Ordering::Relaxed);
        self.gate_level
            .store(gate_level.to_bits(), Ordering::Relaxed);
    }
}

impl Default for LooperAtomics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::track::Track;

    #[test]
    fn test_defaults_are_empty() {
        let atomics = LooperAtomics::new();
        assert_eq!(atomics.track_count(), 0);
        assert_eq!(atomics.master_track(), None);
        assert_eq!(atomics.master_length(), None);
        assert!(!atomics.is_recording_active());
        assert!(atomics.snapshot().is_empty());
    }

    #[test]
    fn test_store_and_find_track() {
        let atomics = LooperAtomics::new();
        let mut track = Track::new(TrackId(7), 32);
        track.is_playing = true;
        track.read_position = 12;

        atomics.store_track(0, &track);
        atomics.store_track_count(1);

        let mirror = atomics.track(TrackId(7)).unwrap();
        assert_eq!(mirror.state(), TrackState::Playing);
        assert_eq!(mirror.read_position(), 12);
        assert!(atomics.track(TrackId(8)).is_none());

        let snapshot = atomics.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, TrackId(7));
    }

    #[test]
    fn test_master_and_queue_roundtrip() {
        let atomics = LooperAtomics::new();
        atomics.store_master(Some(TrackId(2)), Some(48_000), 100);
        atomics.store_queue(Some(TrackId(3)), true);

        assert_eq!(atomics.master_track(), Some(TrackId(2)));
        assert_eq!(atomics.master_length(), Some(48_000));
        assert_eq!(atomics.master_position(), 100);
        assert_eq!(atomics.current_recording_track(), Some(TrackId(3)));
        assert!(atomics.is_last_track_recording());

        atomics.store_master(None, None, 0);
        assert_eq!(atomics.master_length(), None);
    }
}
