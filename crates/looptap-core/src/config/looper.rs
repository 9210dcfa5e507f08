//! Loop engine configuration
//!
//! Value objects handed to the engine at construction. Values that the
//! control side may change while audio runs (trigger threshold, gate
//! parameters, input monitoring) are also reachable through commands or
//! shared atomics; the values here are the starting point.

use serde::{Deserialize, Serialize};

use crate::input::{DetectionMode, DEFAULT_TRIGGER_THRESHOLD};
use crate::types::{DEFAULT_MAX_LOOP_SECONDS, DEFAULT_TRACK_COUNT, MAX_TRACKS};

/// Onset detection settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Linear amplitude a block must exceed to count as an onset
    /// Default: 0.01
    pub threshold: f32,

    /// How a block is judged against the threshold
    /// Default: mean_absolute
    pub mode: DetectionMode,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_TRIGGER_THRESHOLD,
            mode: DetectionMode::default(),
        }
    }
}

/// Input gate settings
///
/// The gate level moves by `open_speed` per sample while the input is
/// above either threshold and by `close_speed` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Apply the gate before detection and recording
    /// Default: false
    pub enabled: bool,
    /// Default: 0.015
    pub amplitude_threshold: f32,
    /// Sample-to-sample change that opens the gate
    /// Default: 0.1
    pub slope_threshold: f32,
    /// Default: 0.05
    pub open_speed: f32,
    /// Default: 0.03
    pub close_speed: f32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            amplitude_threshold: 0.015,
            slope_threshold: 0.1,
            open_speed: 0.05,
            close_speed: 0.03,
        }
    }
}

/// Loop engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LooperConfig {
    /// Number of track slots (clamped to 1..=MAX_TRACKS)
    /// Default: 4
    pub track_count: usize,

    /// Recording capacity per track in seconds
    /// Default: 10.0
    pub max_loop_seconds: f32,

    /// Mix the (gated) input into the output
    /// Default: true
    pub monitor_input: bool,

    pub trigger: TriggerConfig,
    pub gate: GateConfig,
}

impl Default for LooperConfig {
    fn default() -> Self {
        Self {
            track_count: DEFAULT_TRACK_COUNT,
            max_loop_seconds: DEFAULT_MAX_LOOP_SECONDS,
            monitor_input: true,
            trigger: TriggerConfig::default(),
            gate: GateConfig::default(),
        }
    }
}

impl LooperConfig {
    /// Track slot count after clamping
    pub fn track_slots(&self) -> usize {
        self.track_count.clamp(1, MAX_TRACKS)
    }

    /// Per-track buffer capacity in samples at the given rate (at least one)
    pub fn capacity_samples(&self, sample_rate: u32) -> usize {
        let samples = (self.max_loop_seconds.max(0.0) as f64 * sample_rate as f64) as usize;
        samples.max(1)
    }
}
