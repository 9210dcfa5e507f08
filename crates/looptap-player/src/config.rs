//! Player configuration
//!
//! Stored as YAML in the user's config directory.
//! Default location: ~/.config/looptap/config.yaml

use std::path::Path;

use serde::{Deserialize, Serialize};

use looptap_core::audio::{AudioConfig, DeviceId, Direction};
use looptap_core::config::LooperConfig;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Devices and stream settings
    pub audio: AudioConfig,
    /// Tracks, trigger and gate
    pub looper: LooperConfig,
}

impl PlayerConfig {
    /// Pick the device for one direction; takes effect on the next start
    pub fn select_device(&mut self, direction: Direction, device: DeviceId) {
        let audio = std::mem::take(&mut self.audio);
        self.audio = match direction {
            Direction::Input => audio.with_input_device(device),
            Direction::Output => audio.with_output_device(device),
        };
    }
}

/// Load the config, falling back to defaults if missing or malformed
pub fn load(path: &Path) -> PlayerConfig {
    looptap_core::config::load_config(path)
}

pub fn save(config: &PlayerConfig, path: &Path) -> anyhow::Result<()> {
    looptap_core::config::save_config(config, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use looptap_core::input::DetectionMode;

    #[test]
    fn test_sections_default_independently() {
        let yaml = "looper:\n  track_count: 8\n  trigger:\n    mode: block_rms\n";
        let config: PlayerConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.looper.track_count, 8);
        assert_eq!(config.looper.trigger.mode, DetectionMode::BlockRms);
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn test_select_device_keeps_other_direction() {
        let mut config = PlayerConfig::default();
        config.select_device(Direction::Input, DeviceId::with_host("Mic", "ALSA"));
        config.select_device(Direction::Output, DeviceId::with_host("Speakers", "JACK"));
        config.select_device(Direction::Output, DeviceId::new("Headphones"));

        assert_eq!(config.audio.input_device, Some(DeviceId::with_host("Mic", "ALSA")));
        assert_eq!(config.audio.output_device, Some(DeviceId::new("Headphones")));
        assert_eq!(config.audio.buffer_size, AudioConfig::default().buffer_size);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config: PlayerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, PlayerConfig::default());
    }
}
