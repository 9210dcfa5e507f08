//! YAML configuration I/O
//!
//! Loading never fails: a missing file yields defaults and a malformed one
//! yields defaults plus a warning, so a bad config can't keep the looper from
//! starting. Saving reports errors to the caller.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Load configuration from a YAML file, falling back to `T::default()`
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("load_config: {:?} not found, using defaults", path);
        return T::default();
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::warn!("load_config: Failed to read {:?}: {}, using defaults", path, e);
            return T::default();
        }
    };

    match serde_yaml::from_str::<T>(&contents) {
        Ok(config) => {
            log::info!("load_config: Loaded {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("load_config: Failed to parse {:?}: {}, using defaults", path, e);
            T::default()
        }
    }
}

/// Save configuration to a YAML file, creating parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("save_config: Saved {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LooperConfig;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: LooperConfig = load_config(Path::new("/nonexistent/looptap/config.yaml"));
        assert_eq!(config, LooperConfig::default());
    }

    #[test]
    fn test_malformed_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "track_count: [not, a, number").unwrap();

        let config: LooperConfig = load_config(&path);
        assert_eq!(config, LooperConfig::default());
    }

    #[test]
    fn test_roundtrip_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = LooperConfig::default();
        config.track_count = 6;
        config.monitor_input = false;
        config.trigger.threshold = 0.25;
        config.gate.enabled = true;

        save_config(&config, &path).unwrap();
        let loaded: LooperConfig = load_config(&path);

        assert_eq!(loaded, config);
    }
}
