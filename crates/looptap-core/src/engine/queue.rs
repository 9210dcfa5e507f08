//! Sequential recording queue
//!
//! Fixed-capacity storage so queue updates never allocate on the audio
//! thread. `TrackList` is `Copy` and travels inside a command; the engine
//! keeps it in a `RecordingQueue` together with the cursor.

use crate::types::{TrackId, MAX_TRACKS};

/// Ordered list of up to `MAX_TRACKS` track ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackList {
    ids: [TrackId; MAX_TRACKS],
    len: usize,
}

impl TrackList {
    pub const fn new() -> Self {
        Self {
            ids: [TrackId(0); MAX_TRACKS],
            len: 0,
        }
    }

    /// Build from a slice; ids beyond `MAX_TRACKS` are dropped
    pub fn from_slice(ids: &[TrackId]) -> Self {
        let mut list = Self::new();
        for &id in ids.iter().take(MAX_TRACKS) {
            list.ids[list.len] = id;
            list.len += 1;
        }
        list
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<TrackId> {
        self.as_slice().get(index).copied()
    }

    pub fn as_slice(&self) -> &[TrackId] {
        &self.ids[..self.len]
    }
}

impl Default for TrackList {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<TrackId> for TrackList {
    fn from_iter<I: IntoIterator<Item = TrackId>>(iter: I) -> Self {
        let mut list = Self::new();
        for id in iter.into_iter().take(MAX_TRACKS) {
            list.ids[list.len] = id;
            list.len += 1;
        }
        list
    }
}

/// Queue of tracks to record one after another, with its cursor
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordingQueue {
    list: TrackList,
    /// None when idle
    cursor: Option<usize>,
}

impl RecordingQueue {
    /// Load a new list and point at its first entry
    ///
    /// An empty list leaves the queue idle.
    pub fn load(&mut self, list: TrackList) {
        self.list = list;
        self.cursor = if list.is_empty() { None } else { Some(0) };
    }

    /// Move to the next entry; clears the queue when past the end
    pub fn advance(&mut self) -> Option<TrackId> {
        let next = self.cursor? + 1;
        if next < self.list.len() {
            self.cursor = Some(next);
            self.list.get(next)
        } else {
            self.clear();
            None
        }
    }

    pub fn clear(&mut self) {
        self.list = TrackList::new();
        self.cursor = None;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn current(&self) -> Option<TrackId> {
        self.cursor.and_then(|i| self.list.get(i))
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_last(&self) -> bool {
        matches!(self.cursor, Some(i) if i + 1 == self.list.len())
    }

    pub fn list(&self) -> &TrackList {
        &self.list
    }
}
