//! Track slot storage
//!
//! A track owns one fixed-capacity stereo loop buffer plus the cursors and
//! flags the engine drives each block. The buffer is allocated once (on the
//! control thread or during `prepare`) and never resized on the audio thread.

use crate::types::{StereoSample, TrackId, TrackState};

/// One loop slot
#[derive(Debug)]
pub struct Track {
    id: TrackId,
    /// Full-capacity storage; only `0..loop_len` is meaningful
    buffer: Vec<StereoSample>,
    pub(crate) is_recording: bool,
    pub(crate) is_playing: bool,
    /// Start recording on the next detected onset
    pub(crate) armed: bool,
    pub(crate) write_position: usize,
    pub(crate) read_position: usize,
    pub(crate) recorded_length: usize,
    /// Absolute sample clock value at which the current take began
    pub(crate) record_start_offset: u64,
    /// Length after alignment to the master loop (0 until stopped)
    pub(crate) final_length: usize,
    /// Samples actually captured in the current take
    pub(crate) captured: usize,
    /// Input samples to skip at the start of the current block (punch-in)
    pub(crate) input_skip: usize,
    /// Output sample at which playback starts in the current block
    pub(crate) mix_offset: usize,
}

impl Track {
    /// Allocate a silent track with room for `capacity` samples
    pub fn new(id: TrackId, capacity: usize) -> Self {
        Self {
            id,
            buffer: vec![StereoSample::silence(); capacity.max(1)],
            is_recording: false,
            is_playing: false,
            armed: false,
            write_position: 0,
            read_position: 0,
            recorded_length: 0,
            record_start_offset: 0,
            final_length: 0,
            captured: 0,
            input_skip: 0,
            mix_offset: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> TrackId {
        self.id
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn samples(&self) -> &[StereoSample] {
        &self.buffer
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [StereoSample] {
        &mut self.buffer
    }

    /// Whether the slot holds a recorded loop
    #[inline]
    pub fn has_content(&self) -> bool {
        self.final_length > 0 || self.recorded_length > 0
    }

    pub fn state(&self) -> TrackState {
        if self.is_recording {
            TrackState::Recording
        } else if self.is_playing {
            TrackState::Playing
        } else if self.has_content() {
            TrackState::Stopped
        } else {
            TrackState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn write_position(&self) -> usize {
        self.write_position
    }

    pub fn read_position(&self) -> usize {
        self.read_position
    }

    pub fn recorded_length(&self) -> usize {
        self.recorded_length
    }

    pub fn final_length(&self) -> usize {
        self.final_length
    }

    pub fn record_start_offset(&self) -> u64 {
        self.record_start_offset
    }

    /// Loop length used when this track plays
    ///
    /// The master length wins; otherwise the track's own recorded length,
    /// otherwise the raw capacity.
    #[inline]
    pub(crate) fn playback_length(&self, master_length: Option<usize>) -> usize {
        let len = match master_length {
            Some(len) => len,
            None if self.recorded_length > 0 => self.recorded_length,
            None => self.buffer.len(),
        };
        len.clamp(1, self.buffer.len())
    }

    /// Zero the buffer and return to Idle
    pub(crate) fn clear(&mut self) {
        self.buffer.fill(StereoSample::silence());
        self.is_recording = false;
        self.is_playing = false;
        self.armed = false;
        self.write_position = 0;
        self.read_position = 0;
        self.recorded_length = 0;
        self.record_start_offset = 0;
        self.final_length = 0;
        self.captured = 0;
        self.input_skip = 0;
        self.mix_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_track_is_idle_and_silent() {
        let track = Track::new(TrackId(3), 64);
        assert_eq!(track.id(), TrackId(3));
        assert_eq!(track.capacity(), 64);
        assert_eq!(track.state(), TrackState::Idle);
        assert!(track.samples().iter().all(|s| *s == StereoSample::silence()));
    }

    #[test]
    fn test_state_derivation() {
        let mut track = Track::new(TrackId(1), 16);
        track.is_recording = true;
        assert_eq!(track.state(), TrackState::Recording);

        track.is_recording = false;
        track.recorded_length = 8;
        assert_eq!(track.state(), TrackState::Stopped);

        track.is_playing = true;
        assert_eq!(track.state(), TrackState::Playing);
    }

    #[test]
    fn test_playback_length_priority() {
        let mut track = Track::new(TrackId(1), 100);
        assert_eq!(track.playback_length(None), 100);

        track.recorded_length = 40;
        assert_eq!(track.playback_length(None), 40);
        assert_eq!(track.playback_length(Some(60)), 60);
        assert_eq!(track.playback_length(Some(500)), 100);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut track = Track::new(TrackId(1), 8);
        track.samples_mut()[2] = StereoSample::mono(0.5);
        track.is_playing = true;
        track.recorded_length = 8;
        track.final_length = 8;
        track.read_position = 5;

        track.clear();

        assert_eq!(track.state(), TrackState::Idle);
        assert_eq!(track.read_position(), 0);
        assert!(track.samples().iter().all(|s| *s == StereoSample::silence()));
    }
}
