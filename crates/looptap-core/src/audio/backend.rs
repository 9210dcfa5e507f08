//! Audio system entry point
//!
//! Starts a duplex stream pair around a [`LoopEngine`]:
//! - Control thread drives the engine through [`LooperHandle`] (ringbuffer)
//! - Output callback owns the engine exclusively
//! - Input callback feeds captured frames through a second ringbuffer
//! - Atomics and the event queue carry state back without locks
//!
//! [`LoopEngine`]: crate::engine::LoopEngine

use crate::config::LooperConfig;
use crate::engine::{EventReceiver, LooperHandle};

use super::config::AudioConfig;
use super::error::AudioResult;

/// Handle to the active audio system
///
/// Keeps the streams alive. Drop this to stop audio.
pub type AudioHandle = super::cpal_backend::CpalAudioHandle;

/// Result of starting the audio system
///
/// Contains all the handles and communication channels needed by the
/// control side.
pub struct AudioSystemResult {
    /// Handle to keep audio alive (drop to stop)
    pub handle: AudioHandle,
    /// Commands and lock-free state reads
    pub looper: LooperHandle,
    /// Notifications from the audio thread
    pub events: EventReceiver,
    /// Sample rate of the audio system
    pub sample_rate: u32,
    /// Actual buffer size in frames
    pub buffer_size: u32,
    /// Audio latency in milliseconds (one-way, output only)
    pub latency_ms: f32,
}

/// Start the audio system with the given configuration
///
/// Opens the configured (or default) input and output devices, prepares a
/// loop engine for the negotiated sample rate with every configured track
/// slot allocated, and starts both streams.
pub fn start_audio_system(
    config: &AudioConfig,
    looper_config: LooperConfig,
) -> AudioResult<AudioSystemResult> {
    super::cpal_backend::start_audio_system(config, looper_config)
}
