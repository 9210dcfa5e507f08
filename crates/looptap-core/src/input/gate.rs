//! Amplitude/slope gate for the live input
//!
//! Mutes silence and breath noise between phrases while letting onsets
//! through. Each sample, the gate opens toward unity if either the absolute
//! amplitude or the sample-to-sample slope exceeds its threshold, and closes
//! toward zero otherwise. The level moves linearly by `open_speed` or
//! `close_speed` per sample and is clamped to [0, 1].
//!
//! Stereo input is gated with one shared level driven by the louder channel,
//! so the stereo image is not skewed.

use crate::config::GateConfig;
use crate::types::StereoSample;

/// Per-sample gate envelope
#[derive(Debug, Clone)]
pub struct GateEnvelope {
    config: GateConfig,
    level: f32,
    previous: StereoSample,
}

impl GateEnvelope {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            level: 0.0,
            previous: StereoSample::silence(),
        }
    }

    /// Apply the gate in place
    pub fn process(&mut self, block: &mut [StereoSample]) {
        let GateConfig {
            amplitude_threshold,
            slope_threshold,
            open_speed,
            close_speed,
            ..
        } = self.config;

        for sample in block.iter_mut() {
            let input = *sample;
            let amplitude = input.peak();
            let slope = (input.left - self.previous.left)
                .abs()
                .max((input.right - self.previous.right).abs());

            if amplitude > amplitude_threshold || slope > slope_threshold {
                self.level += open_speed;
            } else {
                self.level -= close_speed;
            }
            self.level = self.level.clamp(0.0, 1.0);

            *sample = input * self.level;
            self.previous = input;
        }
    }

    /// Replace thresholds and speeds; takes effect from the next sample
    pub fn set_config(&mut self, config: GateConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
        self.previous = StereoSample::silence();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> GateEnvelope {
        GateEnvelope::new(GateConfig::default())
    }

    #[test]
    fn test_silence_stays_closed() {
        let mut gate = gate();
        let mut block = vec![StereoSample::silence(); 128];
        gate.process(&mut block);

        assert_eq!(gate.level(), 0.0);
        assert!(block.iter().all(|s| *s == StereoSample::silence()));
    }

    #[test]
    fn test_opens_linearly_on_loud_input() {
        let mut gate = gate();
        let open = gate.config().open_speed;
        let mut block = vec![StereoSample::mono(0.5); 4];
        gate.process(&mut block);

        // First sample is scaled by one step of the open ramp
        assert!((block[0].left - 0.5 * open).abs() < 1e-6);
        assert!((gate.level() - 4.0 * open).abs() < 1e-6);
    }

    #[test]
    fn test_level_stays_in_unit_range() {
        let mut gate = gate();
        let mut loud = vec![StereoSample::mono(0.9); 1000];
        gate.process(&mut loud);
        assert_eq!(gate.level(), 1.0);
        assert!((loud[999].left - 0.9).abs() < 1e-6);

        let mut quiet = vec![StereoSample::silence(); 1000];
        gate.process(&mut quiet);
        assert_eq!(gate.level(), 0.0);
    }

    #[test]
    fn test_slope_alone_opens_gate() {
        let mut gate = gate();
        gate.set_config(GateConfig {
            amplitude_threshold: 1.0,
            slope_threshold: 0.1,
            ..GateConfig::default()
        });
        // Amplitude never exceeds 1.0 but the jumps exceed the slope threshold
        let mut block: Vec<StereoSample> = (0..10)
            .map(|i| StereoSample::mono(if i % 2 == 0 { 0.4 } else { -0.4 }))
            .collect();
        gate.process(&mut block);
        assert!(gate.level() > 0.0);
    }

    #[test]
    fn test_louder_channel_drives_both() {
        let mut gate = gate();
        let mut block = vec![StereoSample::new(0.0, 0.5); 20];
        gate.process(&mut block);

        assert!(gate.level() > 0.0);
        assert_eq!(block[19].left, 0.0);
        assert!(block[19].right > 0.0);
    }
}
