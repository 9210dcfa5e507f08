//! Common types for Looptap
//!
//! Fundamental audio types shared by the input analysis, the loop engine and
//! the audio backend: stereo samples, preallocated stereo buffers and track
//! identity/state.

use std::ops::{Index, IndexMut};

/// Default sample rate (48kHz); the actual rate comes from the audio device
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Upper bound on track slots (sizes the fixed arrays on the audio thread)
pub const MAX_TRACKS: usize = 16;

/// Track slots created when no configuration says otherwise
pub const DEFAULT_TRACK_COUNT: usize = 4;

/// Default per-track recording capacity in seconds
pub const DEFAULT_MAX_LOOP_SECONDS: f32 = 10.0;

/// Audio sample type (32-bit float)
pub type Sample = f32;

/// A single stereo sample (left and right channels)
///
/// Uses `#[repr(C)]` to ensure predictable memory layout: [left, right].
/// This enables zero-copy conversion between `&[StereoSample]` and `&[f32]`
/// (interleaved format) using bytemuck.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Same value in both channels
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Peak amplitude (max of abs(left), abs(right))
    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }

    /// Mean absolute amplitude across both channels
    #[inline]
    pub fn mean_abs(&self) -> Sample {
        (self.left.abs() + self.right.abs()) * 0.5
    }

    /// Index of the louder channel (0 = left, 1 = right)
    #[inline]
    pub fn louder_channel(&self) -> u8 {
        if self.right.abs() > self.left.abs() {
            1
        } else {
            0
        }
    }
}

impl std::ops::Add for StereoSample {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            left: self.left + other.left,
            right: self.right + other.right,
        }
    }
}

impl std::ops::AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.left += other.left;
        self.right += other.right;
    }
}

impl std::ops::Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

/// A buffer of stereo samples
///
/// Used both for per-block working buffers (sized once, then resized within
/// capacity on the audio thread) and for track loop storage.
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    samples: Vec<StereoSample>,
}

impl StereoBuffer {
    /// Create an empty buffer with the specified capacity (in stereo samples)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Create a buffer filled with silence
    pub fn silence(len: usize) -> Self {
        Self {
            samples: vec![StereoSample::silence(); len],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    /// Set the working length of a pre-allocated buffer (real-time safe)
    ///
    /// Growing beyond capacity is clamped to capacity instead of allocating.
    /// Fills any newly exposed elements with silence.
    #[inline]
    pub fn set_len_from_capacity(&mut self, new_len: usize) {
        let new_len = new_len.min(self.samples.capacity());
        if new_len > self.samples.len() {
            self.samples.resize(new_len, StereoSample::silence());
        } else {
            self.samples.truncate(new_len);
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[StereoSample] {
        &self.samples
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [StereoSample] {
        &mut self.samples
    }

    /// Zero-copy view of samples as interleaved f32 [L, R, L, R, ...]
    #[inline]
    pub fn as_interleaved(&self) -> &[Sample] {
        bytemuck::cast_slice(&self.samples)
    }

    /// Peak amplitude in the buffer
    pub fn peak(&self) -> Sample {
        self.samples.iter().map(|s| s.peak()).fold(0.0, Sample::max)
    }
}

impl Index<usize> for StereoBuffer {
    type Output = StereoSample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl IndexMut<usize> for StereoBuffer {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.samples[index]
    }
}

/// Track identifier
///
/// Ids are chosen by the control side; the engine maps them onto slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TrackId(pub usize);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Observable state of a track slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// No recorded content
    #[default]
    Idle,
    Recording,
    Playing,
    /// Holds a loop but is not contributing to the output
    Stopped,
}

impl TrackState {
    /// Encode for storage in an `AtomicU8`
    #[inline]
    pub fn as_u8(self) -> u8 {
        match self {
            TrackState::Idle => 0,
            TrackState::Recording => 1,
            TrackState::Playing => 2,
            TrackState::Stopped => 3,
        }
    }

    #[inline]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => TrackState::Recording,
            2 => TrackState::Playing,
            3 => TrackState::Stopped,
            _ => TrackState::Idle,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TrackState::Idle => "idle",
            TrackState::Recording => "recording",
            TrackState::Playing => "playing",
            TrackState::Stopped => "stopped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_sample_operations() {
        let a = StereoSample::new(1.0, -2.0);
        let b = StereoSample::new(0.5, 0.5);

        let sum = a + b;
        assert_eq!(sum.left, 1.5);
        assert_eq!(sum.right, -1.5);

        assert_eq!(a.peak(), 2.0);
        assert_eq!(a.mean_abs(), 1.5);
        assert_eq!(a.louder_channel(), 1);
        assert_eq!(b.louder_channel(), 0);
    }

    #[test]
    fn test_stereo_buffer_interleaved_view() {
        let mut buffer = StereoBuffer::silence(2);
        buffer[0] = StereoSample::new(1.0, 2.0);
        buffer[1] = StereoSample::new(3.0, 4.0);

        assert_eq!(buffer.as_interleaved(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_set_len_from_capacity_never_grows_capacity() {
        let mut buffer = StereoBuffer::with_capacity(8);
        buffer.set_len_from_capacity(4);
        assert_eq!(buffer.len(), 4);

        let capacity = buffer.capacity();
        buffer.set_len_from_capacity(capacity + 100);
        assert_eq!(buffer.len(), capacity);
        assert_eq!(buffer.capacity(), capacity);

        buffer.set_len_from_capacity(2);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_track_state_encoding() {
        for state in [
            TrackState::Idle,
            TrackState::Recording,
            TrackState::Playing,
            TrackState::Stopped,
        ] {
            assert_eq!(TrackState::from_u8(state.as_u8()), state);
        }
        assert_eq!(TrackState::from_u8(200), TrackState::Idle);
    }
}
