//! Onset detection on the input stream
//!
//! The detector looks at each input block, decides whether the signal is
//! above the user threshold and fires the shared [`TriggerEvent`] on a rising
//! edge only: a block above threshold that follows a block below it. Blocks
//! that stay above threshold produce no further triggers until the signal
//! drops below it again.
//!
//! The threshold lives in [`TriggerSettings`] so the control thread can change
//! it while the audio thread is running; it is read once per block.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::trigger_event::{TriggerChannel, TriggerEvent};
use crate::types::StereoSample;

/// Default detection threshold (linear amplitude)
pub const DEFAULT_TRIGGER_THRESHOLD: f32 = 0.01;

/// How a block is judged to be above threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Per-sample mean absolute amplitude across channels; the first sample
    /// above threshold is the onset
    #[default]
    MeanAbsolute,
    /// RMS energy over the whole block; the onset is the first sample above
    /// threshold, or the block start if no single sample is
    BlockRms,
}

/// Runtime-adjustable detector parameters shared with the control thread
#[derive(Debug)]
pub struct TriggerSettings {
    /// f32 bits
    threshold: AtomicU32,
}

impl TriggerSettings {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: AtomicU32::new(threshold.max(0.0).to_bits()),
        }
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        f32::from_bits(self.threshold.load(Ordering::Relaxed))
    }

    /// Negative values are clamped to zero
    pub fn set_threshold(&self, threshold: f32) {
        self.threshold
            .store(threshold.max(0.0).to_bits(), Ordering::Relaxed);
    }
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER_THRESHOLD)
    }
}

/// Rising-edge onset detector
pub struct TriggerDetector {
    event: Arc<TriggerEvent>,
    settings: Arc<TriggerSettings>,
    mode: DetectionMode,
    /// Whether the previous block was above threshold
    was_above: bool,
    /// Samples analysed since the last reset
    clock: u64,
}

impl TriggerDetector {
    pub fn new(event: Arc<TriggerEvent>, settings: Arc<TriggerSettings>, mode: DetectionMode) -> Self {
        Self {
            event,
            settings,
            mode,
            was_above: false,
            clock: 0,
        }
    }

    /// Analyse one block and fire the trigger event on a rising edge
    ///
    /// Returns true if this block fired.
    pub fn analyze(&mut self, block: &[StereoSample]) -> bool {
        if block.is_empty() {
            return false;
        }

        let threshold = self.settings.threshold();
        let onset = match self.mode {
            DetectionMode::MeanAbsolute => first_above(block, threshold),
            DetectionMode::BlockRms => {
                if block_rms(block) > threshold {
                    Some(first_above(block, threshold).unwrap_or(0))
                } else {
                    None
                }
            }
        };

        let above = onset.is_some();
        let fired = match onset {
            Some(offset) if !self.was_above => {
                let channel = if block[offset].louder_channel() == 1 {
                    TriggerChannel::Right
                } else {
                    TriggerChannel::Left
                };
                self.event
                    .fire(offset, self.clock + offset as u64, channel);
                true
            }
            _ => false,
        };

        self.was_above = above;
        self.clock += block.len() as u64;
        fired
    }

    /// Clear edge state, the sample clock and the shared event
    pub fn reset(&mut self) {
        self.was_above = false;
        self.clock = 0;
        self.event.reset();
    }

    /// Absolute position of the next block's first sample
    #[inline]
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DetectionMode) {
        self.mode = mode;
    }

    pub fn event(&self) -> &Arc<TriggerEvent> {
        &self.event
    }

    pub fn settings(&self) -> &Arc<TriggerSettings> {
        &self.settings
    }
}

fn first_above(block: &[StereoSample], threshold: f32) -> Option<usize> {
    block.iter().position(|s| s.mean_abs() > threshold)
}

fn block_rms(block: &[StereoSample]) -> f32 {
    let sum: f32 = block
        .iter()
        .map(|s| (s.left * s.left + s.right * s.right) * 0.5)
        .sum();
    (sum / block.len() as f32).sqrt()
}
