//! Audio backend error types
//!
//! Only start-up can fail. Once the streams run, problems are logged from the
//! stream error callbacks and the engine keeps going.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    /// Enumeration found nothing in the requested direction
    #[error("No audio devices found")]
    NoDevices,

    #[error("No default output device: {0}")]
    NoDefaultDevice(String),

    /// No input to record from
    #[error("No default input device: {0}")]
    NoInputDevice(String),

    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Querying or choosing a stream configuration failed
    #[error("Device configuration error: {0}")]
    ConfigError(String),

    #[error("Could not build stream: {0}")]
    StreamBuildError(String),

    #[error("Could not start stream: {0}")]
    StreamPlayError(String),

    /// Input and output devices run at different rates
    #[error("Sample rate mismatch: output={output}Hz, input={input}Hz")]
    SampleRateMismatch { output: u32, input: u32 },
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
