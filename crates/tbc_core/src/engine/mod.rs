//! Decode engine selection and dispatch.
//!
//! Three engine families turn a field window into a [`ComponentFrame`]:
//! - comb filters for NTSC colour carriers ([`CombDecoder`])
//! - PAL delay-line and transform decoders ([`PalDecoder`])
//! - a pass-through luma decoder ([`MonoDecoder`])
//!
//! [`select_engine`] resolves the requested engine against the source's
//! colour carrier, and [`Engine::configure`] builds the single instance a
//! session owns.

pub mod comb;
mod dsp;
pub mod mono;
pub mod pal;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OpenError, OpenResult};
use crate::frame::ComponentFrame;
use crate::metadata::{VideoParameters, VideoSystem};
use crate::window::FieldWindow;

pub use comb::CombDecoder;
pub use mono::MonoDecoder;
pub use pal::PalDecoder;

/// Requested or resolved decode engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EngineKind {
    /// Horizontal band-pass comb.
    Ntsc1D,
    /// Line comb within a field.
    Ntsc2D,
    /// Adaptive frame comb.
    Ntsc3D,
    /// Frame comb without motion adaptation.
    Ntsc3DNoAdapt,
    /// PAL delay-line decoder.
    Pal2D,
    /// Per-line FFT band split.
    Transform2D,
    /// FFT band split with temporal chroma averaging.
    Transform3D,
    /// Luma only.
    Mono,
    /// Pick the default for the source's standard.
    #[default]
    Auto,
}

/// Engine family, decided by the colour carrier an engine expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFamily {
    Comb,
    Pal,
    Mono,
}

impl EngineKind {
    /// Parse an engine name, case-insensitively. Unknown names are `Auto`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ntsc1d" => Self::Ntsc1D,
            "ntsc2d" => Self::Ntsc2D,
            "ntsc3d" => Self::Ntsc3D,
            "ntsc3dnoadapt" => Self::Ntsc3DNoAdapt,
            "pal2d" => Self::Pal2D,
            "transform2d" => Self::Transform2D,
            "transform3d" => Self::Transform3D,
            "mono" => Self::Mono,
            _ => Self::Auto,
        }
    }

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ntsc1D => "ntsc1d",
            Self::Ntsc2D => "ntsc2d",
            Self::Ntsc3D => "ntsc3d",
            Self::Ntsc3DNoAdapt => "ntsc3dnoadapt",
            Self::Pal2D => "pal2d",
            Self::Transform2D => "transform2d",
            Self::Transform3D => "transform3d",
            Self::Mono => "mono",
            Self::Auto => "auto",
        }
    }

    /// Family of a concrete engine. `Auto` has none.
    pub fn family(&self) -> Option<EngineFamily> {
        match self {
            Self::Ntsc1D | Self::Ntsc2D | Self::Ntsc3D | Self::Ntsc3DNoAdapt => {
                Some(EngineFamily::Comb)
            }
            Self::Pal2D | Self::Transform2D | Self::Transform3D => Some(EngineFamily::Pal),
            Self::Mono => Some(EngineFamily::Mono),
            Self::Auto => None,
        }
    }

    /// Frames needed on each side of the decoded frame.
    pub fn margins(&self) -> Margins {
        match self {
            Self::Mono | Self::Auto => Margins::NONE,
            _ => Margins::new(1, 1),
        }
    }

    /// Default engine for a video standard.
    pub fn default_for(system: VideoSystem) -> Self {
        if system.has_ntsc_carrier() {
            Self::Ntsc2D
        } else {
            Self::Pal2D
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for EngineKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<EngineKind> for String {
    fn from(kind: EngineKind) -> Self {
        kind.name().to_string()
    }
}

/// Temporal margins, in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margins {
    pub look_behind: usize,
    pub look_ahead: usize,
}

impl Margins {
    /// No temporal neighbours.
    pub const NONE: Self = Self {
        look_behind: 0,
        look_ahead: 0,
    };

    pub const fn new(look_behind: usize, look_ahead: usize) -> Self {
        Self {
            look_behind,
            look_ahead,
        }
    }
}

/// Outcome of engine selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSelection {
    /// Concrete engine, never `Auto`.
    pub kind: EngineKind,
    pub margins: Margins,
    /// The explicitly requested engine, when it was replaced.
    pub corrected_from: Option<EngineKind>,
}

/// Resolve a requested engine for a source's standard.
///
/// A family mismatch is not an error: the standard's default engine is used
/// and a warning is logged.
pub fn select_engine(requested: EngineKind, system: VideoSystem) -> EngineSelection {
    let default = EngineKind::default_for(system);
    let expected_family = default.family();

    let (kind, corrected_from) = match requested.family() {
        None => (default, None),
        Some(EngineFamily::Mono) => (EngineKind::Mono, None),
        family if family == expected_family => (requested, None),
        Some(_) => {
            tracing::warn!(
                "[Engine] {} decoder requested for a {} source, using {} instead",
                requested,
                system,
                default
            );
            (default, Some(requested))
        }
    };

    EngineSelection {
        kind,
        margins: kind.margins(),
        corrected_from,
    }
}

/// Chroma and noise settings shared by all engines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Chroma gain multiplier.
    pub chroma_gain: f64,
    /// Chroma rotation in degrees.
    pub chroma_phase: f64,
    /// Chroma noise reduction level in IRE (NTSC only).
    pub chroma_nr: f64,
    /// Luma noise reduction level in IRE.
    pub luma_nr: f64,
    /// Correct chroma phase from the measured burst (NTSC only).
    pub phase_compensation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chroma_gain: 1.0,
            chroma_phase: 0.0,
            chroma_nr: 0.0,
            luma_nr: 0.0,
            phase_compensation: false,
        }
    }
}

/// The one decode engine a session owns.
#[derive(Debug)]
pub enum Engine {
    Comb(CombDecoder),
    Pal(PalDecoder),
    Mono(MonoDecoder),
}

impl Engine {
    /// Build the engine for a resolved selection.
    pub fn configure(
        selection: &EngineSelection,
        params: &VideoParameters,
        config: &EngineConfig,
    ) -> OpenResult<Self> {
        if !config.chroma_gain.is_finite() || !config.chroma_phase.is_finite() {
            return Err(OpenError::EngineConfigurationFailed(format!(
                "chroma gain {} and phase {} must be finite",
                config.chroma_gain, config.chroma_phase
            )));
        }
        if params.field_width < 4 || params.field_height < 2 {
            return Err(OpenError::EngineConfigurationFailed(format!(
                "field {}x{} is too small to decode",
                params.field_width, params.field_height
            )));
        }

        let engine = match selection.kind.family() {
            Some(EngineFamily::Comb) => {
                Self::Comb(CombDecoder::new(selection.kind, params, *config))
            }
            Some(EngineFamily::Pal) => Self::Pal(PalDecoder::new(selection.kind, params, *config)),
            Some(EngineFamily::Mono) => Self::Mono(MonoDecoder::new(params, *config)),
            None => {
                return Err(OpenError::EngineConfigurationFailed(
                    "engine must be resolved before configuration".to_string(),
                ))
            }
        };

        tracing::debug!(
            "[Engine] Configured {} (margins {}/{})",
            selection.kind,
            selection.margins.look_behind,
            selection.margins.look_ahead
        );
        Ok(engine)
    }

    /// Decode the window's current frame.
    pub fn decode(&mut self, window: &FieldWindow) -> ComponentFrame {
        match self {
            Self::Comb(d) => d.decode(window),
            Self::Pal(d) => d.decode(window),
            Self::Mono(d) => d.decode(window),
        }
    }

    pub fn is_mono(&self) -> bool {
        matches!(self, Self::Mono(_))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::metadata::{CaptureParameters, FieldRecord};
    use crate::window::SourceField;

    /// Small NTSC-shaped parameters: 32 samples by 263 lines per field.
    pub(crate) fn small_params(system: VideoSystem) -> VideoParameters {
        let field_height = if system == VideoSystem::Pal { 313 } else { 263 };
        VideoParameters::from_capture(CaptureParameters {
            system,
            field_width: 32,
            field_height,
            active_video_start: 8,
            active_video_end: 28,
            colour_burst_start: 0,
            colour_burst_end: 8,
            white_16b_ire: 50000,
            black_16b_ire: 10000,
            ..Default::default()
        })
        .unwrap()
    }

    /// Window of `frames` frames with every field from `sample`.
    pub(crate) fn window_from(
        params: &VideoParameters,
        frames: usize,
        start_frame: usize,
        sample: impl Fn(usize, usize, usize) -> u16,
    ) -> FieldWindow {
        let mut fields = Vec::new();
        for f in 0..frames * 2 {
            let mut data = Vec::with_capacity(params.field_length());
            for line in 0..params.field_height {
                for x in 0..params.field_width {
                    data.push(sample(f, line, x));
                }
            }
            fields.push(SourceField {
                record: FieldRecord {
                    seq_no: f as i64 + 1,
                    is_first_field: f % 2 == 0,
                    ..Default::default()
                },
                data,
            });
        }
        FieldWindow {
            fields,
            start_index: start_frame * 2,
            end_index: start_frame * 2 + 2,
        }
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!(EngineKind::parse("NTSC3DNoAdapt"), EngineKind::Ntsc3DNoAdapt);
        assert_eq!(EngineKind::parse("Transform2D"), EngineKind::Transform2D);
        assert_eq!(EngineKind::parse("mono"), EngineKind::Mono);
        assert_eq!(EngineKind::parse("secam"), EngineKind::Auto);
        assert_eq!(EngineKind::parse(""), EngineKind::Auto);
    }

    #[test]
    fn auto_resolves_by_colour_carrier() {
        assert_eq!(
            select_engine(EngineKind::Auto, VideoSystem::Ntsc).kind,
            EngineKind::Ntsc2D
        );
        assert_eq!(
            select_engine(EngineKind::Auto, VideoSystem::Pal).kind,
            EngineKind::Pal2D
        );
        assert_eq!(
            select_engine(EngineKind::Auto, VideoSystem::PalM).kind,
            EngineKind::Pal2D
        );
    }

    #[test]
    fn mismatched_family_is_corrected() {
        let selection = select_engine(EngineKind::Transform3D, VideoSystem::Ntsc);
        assert_eq!(selection.kind, EngineKind::Ntsc2D);
        assert_eq!(selection.corrected_from, Some(EngineKind::Transform3D));

        let selection = select_engine(EngineKind::Ntsc3D, VideoSystem::Pal);
        assert_eq!(selection.kind, EngineKind::Pal2D);
        assert_eq!(selection.corrected_from, Some(EngineKind::Ntsc3D));
    }

    #[test]
    fn matching_and_mono_requests_are_kept() {
        let selection = select_engine(EngineKind::Ntsc3D, VideoSystem::Ntsc);
        assert_eq!(selection.kind, EngineKind::Ntsc3D);
        assert_eq!(selection.corrected_from, None);
        assert_eq!(selection.margins, Margins::new(1, 1));

        for system in [VideoSystem::Ntsc, VideoSystem::Pal, VideoSystem::PalM] {
            let selection = select_engine(EngineKind::Mono, system);
            assert_eq!(selection.kind, EngineKind::Mono);
            assert_eq!(selection.margins, Margins::NONE);
            assert_eq!(selection.corrected_from, None);
        }
    }

    #[test]
    fn engine_kind_serializes_by_name() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            engine: EngineKind,
        }
        let parsed: Wrapper = toml::from_str("engine = \"Transform3D\"").unwrap();
        assert_eq!(parsed.engine, EngineKind::Transform3D);
        let parsed: Wrapper = toml::from_str("engine = \"bogus\"").unwrap();
        assert_eq!(parsed.engine, EngineKind::Auto);
        let out = toml::to_string(&Wrapper {
            engine: EngineKind::Ntsc3DNoAdapt,
        })
        .unwrap();
        assert!(out.contains("\"ntsc3dnoadapt\""));
    }

    #[test]
    fn configure_builds_one_engine_of_the_family() {
        let params = small_params(VideoSystem::Ntsc);
        let config = EngineConfig::default();
        let comb = Engine::configure(
            &select_engine(EngineKind::Auto, VideoSystem::Ntsc),
            &params,
            &config,
        )
        .unwrap();
        assert!(matches!(comb, Engine::Comb(_)));

        let mono = Engine::configure(
            &select_engine(EngineKind::Mono, VideoSystem::Ntsc),
            &params,
            &config,
        )
        .unwrap();
        assert!(mono.is_mono());
    }

    #[test]
    fn unresolved_or_invalid_config_fails() {
        let params = small_params(VideoSystem::Ntsc);
        let auto = EngineSelection {
            kind: EngineKind::Auto,
            margins: Margins::NONE,
            corrected_from: None,
        };
        assert!(matches!(
            Engine::configure(&auto, &params, &EngineConfig::default()),
            Err(OpenError::EngineConfigurationFailed(_))
        ));

        let config = EngineConfig {
            chroma_gain: f64::NAN,
            ..Default::default()
        };
        assert!(Engine::configure(
            &select_engine(EngineKind::Auto, VideoSystem::Ntsc),
            &params,
            &config
        )
        .is_err());
    }

    #[test]
    fn flat_window_decodes_flat_for_every_engine() {
        let kinds = [
            (EngineKind::Ntsc1D, VideoSystem::Ntsc),
            (EngineKind::Ntsc2D, VideoSystem::Ntsc),
            (EngineKind::Ntsc3D, VideoSystem::Ntsc),
            (EngineKind::Ntsc3DNoAdapt, VideoSystem::Ntsc),
            (EngineKind::Pal2D, VideoSystem::Pal),
            (EngineKind::Transform2D, VideoSystem::Pal),
            (EngineKind::Transform3D, VideoSystem::Pal),
            (EngineKind::Mono, VideoSystem::Ntsc),
        ];
        for (kind, system) in kinds {
            let params = small_params(system);
            let selection = select_engine(kind, system);
            assert_eq!(selection.kind, kind);
            let mut engine =
                Engine::configure(&selection, &params, &EngineConfig::default()).unwrap();
            let window = window_from(&params, 3, 1, |_, _, _| 30000);
            let frame = engine.decode(&window);

            assert_eq!(frame.width(), 32);
            assert_eq!(frame.height(), params.frame_height());
            assert!(
                frame.y_plane().iter().all(|&s| s == 30000.0),
                "{kind}: luma not flat"
            );
            assert!(
                frame.u_plane().iter().chain(frame.v_plane()).all(|&s| s == 0.0),
                "{kind}: chroma not zero"
            );
        }
    }
}
