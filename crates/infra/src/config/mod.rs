//! Configuration loading
//!
//! This module provides utilities for loading application configuration
//! from files and environment variable overrides.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_file, probe_config_paths};
