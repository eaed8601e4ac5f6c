//! Configuration management for the TBC decoder.
//!
//! This module provides:
//! - TOML-based configuration with `[decode]`, `[output]` and `[logging]`
//!   sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Range validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use tbc_core::config::{ConfigManager, ConfigSection};
//! use tbc_core::engine::EngineKind;
//!
//! let mut config = ConfigManager::new(".config/tbc.toml");
//! config.load_or_create().unwrap();
//!
//! config.settings_mut().decode.engine = EngineKind::Transform3D;
//! config.update_section(ConfigSection::Decode).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{ConfigSection, DecodeSettings, LoggingSettings, OutputSettings, Settings};
