//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::engine::{EngineConfig, EngineKind};
use crate::logging::LogLevel;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Decoder selection and chroma options.
    #[serde(default)]
    pub decode: DecodeSettings,

    /// Output frame geometry and timing.
    #[serde(default)]
    pub output: OutputSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Check value ranges.
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        let decode = &self.decode;
        let finite = [
            ("chroma_gain", decode.chroma_gain),
            ("chroma_phase", decode.chroma_phase),
            ("chroma_nr", decode.chroma_nr),
            ("luma_nr", decode.luma_nr),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("decode.{name} must be finite (got {value})"));
        }
        if decode.chroma_gain < 0.0 {
            return Err(format!(
                "decode.chroma_gain must not be negative (got {})",
                decode.chroma_gain
            ));
        }
        if decode.chroma_nr < 0.0 || decode.luma_nr < 0.0 {
            return Err(format!(
                "noise reduction levels must not be negative (chroma {}, luma {})",
                decode.chroma_nr, decode.luma_nr
            ));
        }
        if self.output.fps_den < 1 {
            return Err(format!(
                "output.fps_den must be at least 1 (got {})",
                self.output.fps_den
            ));
        }
        Ok(())
    }
}

/// Decoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeSettings {
    /// Decoder name, or "auto" to pick by video system.
    #[serde(default)]
    pub engine: EngineKind,

    /// Chroma gain multiplier.
    #[serde(default = "default_chroma_gain")]
    pub chroma_gain: f64,

    /// Chroma phase rotation in degrees.
    #[serde(default)]
    pub chroma_phase: f64,

    /// Chroma noise reduction in IRE (NTSC decoders only).
    #[serde(default)]
    pub chroma_nr: f64,

    /// Luma noise reduction in IRE.
    #[serde(default)]
    pub luma_nr: f64,

    /// Adjust chroma phase per field from the burst (NTSC decoders only).
    #[serde(default)]
    pub phase_compensation: bool,

    /// Swap first and second fields of every frame.
    #[serde(default)]
    pub reverse_fields: bool,
}

fn default_chroma_gain() -> f64 {
    1.0
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            engine: EngineKind::Auto,
            chroma_gain: default_chroma_gain(),
            chroma_phase: 0.0,
            chroma_nr: 0.0,
            luma_nr: 0.0,
            phase_compensation: false,
            reverse_fields: false,
        }
    }
}

impl DecodeSettings {
    /// Engine options derived from these settings.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            chroma_gain: self.chroma_gain,
            chroma_phase: self.chroma_phase,
            chroma_nr: self.chroma_nr,
            luma_nr: self.luma_nr,
            phase_compensation: self.phase_compensation,
        }
    }
}

/// Output frame configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Round output width and height up to this multiple (0 = no padding).
    #[serde(default = "default_padding_multiple")]
    pub padding_multiple: usize,

    /// Frame rate override numerator (0 = native rate).
    #[serde(default)]
    pub fps_num: i64,

    /// Frame rate override denominator.
    #[serde(default = "default_fps_den")]
    pub fps_den: i64,
}

fn default_padding_multiple() -> usize {
    8
}

fn default_fps_den() -> i64 {
    1
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            padding_multiple: default_padding_multiple(),
            fps_num: 0,
            fps_den: default_fps_den(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is not set.
    #[serde(default)]
    pub level: LogLevel,

    /// Also write logs to a daily file in this folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Decode,
    Output,
    Logging,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 3] = [Self::Decode, Self::Output, Self::Logging];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Decode => "decode",
            ConfigSection::Output => "output",
            ConfigSection::Logging => "logging",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[decode]"));
        assert!(toml.contains("[output]"));
        assert!(toml.contains("padding_multiple = 8"));
        assert!(toml.contains("engine = \"auto\""));
    }

    #[test]
    fn settings_round_trip() {
        let mut settings = Settings::default();
        settings.decode.engine = EngineKind::Transform3D;
        settings.decode.chroma_gain = 1.5;
        settings.output.fps_num = 50;
        settings.logging.log_dir = Some("logs".to_string());

        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[decode]\nengine = \"NTSC3D\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.decode.engine, EngineKind::Ntsc3D);
        assert_eq!(parsed.decode.chroma_gain, 1.0);
        assert_eq!(parsed.output.padding_multiple, 8);
        assert_eq!(parsed.output.fps_den, 1);
        assert_eq!(parsed.logging.level, LogLevel::Info);
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        assert!(Settings::default().validate().is_ok());

        let mut settings = Settings::default();
        settings.output.fps_den = 0;
        assert!(settings.validate().unwrap_err().contains("fps_den"));

        let mut settings = Settings::default();
        settings.decode.luma_nr = -1.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.decode.chroma_phase = f64::INFINITY;
        assert!(settings.validate().unwrap_err().contains("chroma_phase"));
    }

    #[test]
    fn engine_config_carries_decode_options() {
        let decode = DecodeSettings {
            chroma_gain: 2.0,
            phase_compensation: true,
            ..Default::default()
        };
        let config = decode.engine_config();
        assert_eq!(config.chroma_gain, 2.0);
        assert!(config.phase_compensation);
        assert_eq!(config.luma_nr, 0.0);
    }
}
