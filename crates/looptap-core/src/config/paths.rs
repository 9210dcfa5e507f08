//! Config file location

use std::path::PathBuf;

/// File name of the looptap config inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Get the looptap config directory
///
/// Returns: `~/.config/looptap` (platform equivalent via `dirs`), falling back
/// to `./looptap` when no config or home directory is known.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("looptap")
}

/// Get the default config file path: `<config dir>/config.yaml`
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_ends_with_app_name() {
        assert!(default_config_dir().ends_with("looptap"));
    }

    #[test]
    fn test_config_path_includes_filename() {
        let path = default_config_path();
        assert!(path.ends_with(CONFIG_FILE_NAME));
        assert_eq!(path.parent(), Some(default_config_dir().as_path()));
    }
}
