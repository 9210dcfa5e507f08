//! Looptap Core - real-time multi-track loop recording engine

pub mod audio;
pub mod config;
pub mod engine;
pub mod input;
pub mod types;

pub use types::*;
