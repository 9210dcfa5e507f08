//! Audio backend configuration
//!
//! Device selection and stream settings for the duplex (input + output)
//! stream the looper runs on.

use serde::{Deserialize, Serialize};

use crate::engine::MAX_BLOCK_SIZE;
use crate::types::DEFAULT_SAMPLE_RATE;

/// Maximum buffer size to pre-allocate (frames)
///
/// Matches the engine's block size so a callback never needs chunking in
/// the common case.
pub const MAX_BUFFER_SIZE: usize = MAX_BLOCK_SIZE;

/// Smallest fixed buffer size accepted (frames)
pub const MIN_BUFFER_SIZE: u32 = 64;

/// Default buffer size when no preference is specified (frames)
/// 512 frames is a safe default that works on most systems
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Buffer size used in low-latency mode (frames)
pub const LOW_LATENCY_BUFFER_SIZE: u32 = 256;

/// Preferred buffer size for audio streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Let the backend pick a safe default
    #[default]
    Default,
    /// Request a specific buffer size in frames (clamped to supported bounds)
    Fixed(u32),
    /// Smallest buffer that is still reliable on most systems
    LowLatency,
}

impl BufferSize {
    /// Buffer size in frames that will be requested from the device
    pub fn frames(&self) -> u32 {
        match self {
            BufferSize::Default => DEFAULT_BUFFER_SIZE,
            BufferSize::Fixed(frames) => (*frames).clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE as u32),
            BufferSize::LowLatency => LOW_LATENCY_BUFFER_SIZE,
        }
    }

    /// Latency in milliseconds for a given sample rate
    pub fn latency_ms(&self, sample_rate: u32) -> f32 {
        (self.frames() as f32 / sample_rate.max(1) as f32) * 1000.0
    }
}

/// Audio device identifier
///
/// Includes both the device name and the host backend (JACK, ALSA, etc.)
/// so devices from different hosts can be told apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    /// Audio host identifier (e.g., "JACK", "ALSA", "CoreAudio")
    /// If None, all hosts are searched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// Get a display label that includes the host if available
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Configuration for the audio backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Recording device (None = system default input)
    pub input_device: Option<DeviceId>,

    /// Playback device (None = system default output)
    pub output_device: Option<DeviceId>,

    /// Preferred buffer size
    pub buffer_size: BufferSize,

    /// Preferred sample rate (None = 48kHz if the device supports it)
    pub sample_rate: Option<u32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            buffer_size: BufferSize::default(),
            sample_rate: None,
        }
    }
}

impl AudioConfig {
    pub fn with_input_device(mut self, device: DeviceId) -> Self {
        self.input_device = Some(device);
        self
    }

    pub fn with_output_device(mut self, device: DeviceId) -> Self {
        self.output_device = Some(device);
        self
    }

    /// Set the preferred buffer size
    pub fn with_buffer_size(mut self, size: BufferSize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set a fixed buffer size in frames
    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }

    /// Set the preferred sample rate
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    /// Sample rate to ask the devices for
    pub fn target_sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size_frames() {
        assert_eq!(BufferSize::Default.frames(), DEFAULT_BUFFER_SIZE);
        assert_eq!(BufferSize::LowLatency.frames(), LOW_LATENCY_BUFFER_SIZE);
        assert_eq!(BufferSize::Fixed(8).frames(), MIN_BUFFER_SIZE);
        assert_eq!(BufferSize::Fixed(1_000_000).frames(), MAX_BUFFER_SIZE as u32);
        assert_eq!(BufferSize::Fixed(128).frames(), 128);
    }

    #[test]
    fn test_latency() {
        let latency = BufferSize::Fixed(480).latency_ms(48_000);
        assert!((latency - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_builders() {
        let config = AudioConfig::default()
            .with_input_device(DeviceId::with_host("hw:1,0", "ALSA"))
            .with_buffer_frames(128)
            .with_sample_rate(44_100);

        assert_eq!(
            config.input_device.as_ref().map(|d| d.display_label()),
            Some("[ALSA] hw:1,0".to_string())
        );
        assert_eq!(config.output_device, None);
        assert_eq!(config.buffer_size, BufferSize::Fixed(128));
        assert_eq!(config.target_sample_rate(), 44_100);
        assert_eq!(AudioConfig::default().target_sample_rate(), DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AudioConfig = serde_yaml::from_str("sample_rate: 96000\n").unwrap();
        assert_eq!(config.sample_rate, Some(96_000));
        assert_eq!(config.buffer_size, BufferSize::Default);
        assert!(config.input_device.is_none());
    }
}
