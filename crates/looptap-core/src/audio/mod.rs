//! Audio I/O for Looptap
//!
//! Runs the loop engine on a CPAL duplex stream pair.
//!
//! # Architecture
//!
//! The audio system follows a lock-free design for real-time safety:
//!
//! - **Control Thread**: Sends commands via lock-free ringbuffer
//! - **Output Thread**: Owns the LoopEngine exclusively, processes commands
//! - **Input Thread**: Queues captured frames for the output thread
//! - **Atomics**: Control side reads loop state via relaxed atomics (no locks)
//!
//! # Example Usage
//!
//! ```ignore
//! use looptap_core::audio::{start_audio_system, AudioConfig};
//! use looptap_core::config::LooperConfig;
//!
//! let mut system = start_audio_system(&AudioConfig::default(), LooperConfig::default())?;
//!
//! system.looper.start_sequential_recording(&[TrackId(1), TrackId(2)]);
//! let master = system.looper.master_loop_length();
//! ```

mod backend;
mod config;
mod cpal_backend;
mod device;
mod error;

pub use backend::{start_audio_system, AudioHandle, AudioSystemResult};
pub use config::{
    AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, LOW_LATENCY_BUFFER_SIZE,
    MAX_BUFFER_SIZE, MIN_BUFFER_SIZE,
};
pub use device::{
    find_device_by_id, get_devices, get_input_devices, get_output_devices, AudioDevice, Direction,
};
pub use error::{AudioError, AudioResult};
