//! Configuration for looptap
//!
//! - Generic YAML config loading/saving
//! - Config file location
//! - Loop engine, trigger and gate settings
//!
//! # Usage
//!
//! ```ignore
//! use looptap_core::config::{default_config_path, load_config, save_config, LooperConfig};
//!
//! let path = default_config_path();
//! let config: LooperConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod io;
mod looper;
mod paths;

pub use io::{load_config, save_config};
pub use looper::{GateConfig, LooperConfig, TriggerConfig};
pub use paths::{default_config_dir, default_config_path, CONFIG_FILE_NAME};
