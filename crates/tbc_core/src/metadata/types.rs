//! Parameter record and field record types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{MetadataError, MetadataResult};

/// Video standard of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VideoSystem {
    /// 525-line, NTSC colour carrier.
    #[default]
    #[serde(rename = "NTSC")]
    Ntsc,
    /// 625-line, PAL colour carrier.
    #[serde(rename = "PAL")]
    Pal,
    /// 525-line, PAL colour carrier.
    #[serde(rename = "PAL_M", alias = "PAL-M")]
    PalM,
}

impl VideoSystem {
    /// Parse the system name used by metadata sidecars.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NTSC" => Some(Self::Ntsc),
            "PAL" => Some(Self::Pal),
            "PAL_M" | "PAL-M" | "PALM" => Some(Self::PalM),
            _ => None,
        }
    }

    /// Sidecar name for this system.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ntsc => "NTSC",
            Self::Pal => "PAL",
            Self::PalM => "PAL_M",
        }
    }

    /// Whether this is a 525-line system (NTSC or PAL-M).
    ///
    /// Drives frame rate, aspect ratio and colour description.
    pub fn is_ntsc_family(&self) -> bool {
        matches!(self, Self::Ntsc | Self::PalM)
    }

    /// Whether the colour carrier is NTSC.
    ///
    /// Drives the decoder family. PAL-M carries a PAL colour carrier.
    pub fn has_ntsc_carrier(&self) -> bool {
        matches!(self, Self::Ntsc)
    }

    /// Colour subcarrier frequency in Hz.
    pub fn subcarrier_frequency(&self) -> f64 {
        match self {
            Self::Ntsc => 315.0e6 / 88.0,
            Self::Pal => (283.75 * 15625.0) + 25.0,
            Self::PalM => 5.0e6 * (63.0 / 88.0) * (909.0 / 910.0),
        }
    }

    /// First and last (exclusive) active lines within an interlaced frame.
    pub fn active_frame_lines(&self) -> (usize, usize) {
        match self {
            // Frame line 44 is field line 23, frame line 620 is field line 311
            Self::Pal => (44, 620),
            // Frame line 40 is field line 21, frame line 525 is field line 263
            Self::Ntsc | Self::PalM => (40, 525),
        }
    }
}

impl fmt::Display for VideoSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw capture-level values as stored in a sidecar, before validation.
#[derive(Debug, Clone, Default)]
pub struct CaptureParameters {
    pub system: VideoSystem,
    pub sample_rate: f64,
    pub field_width: i64,
    pub field_height: i64,
    pub active_video_start: i64,
    pub active_video_end: i64,
    pub colour_burst_start: i64,
    pub colour_burst_end: i64,
    pub white_16b_ire: i64,
    pub black_16b_ire: i64,
    pub number_of_sequential_fields: i64,
    pub is_subcarrier_locked: bool,
    pub is_widescreen: bool,
    pub is_mapped: bool,
    pub tape_format: Option<String>,
}

/// Validated geometry and calibration of one source.
///
/// Only produced by [`VideoParameters::from_capture`], so every instance
/// satisfies the geometry invariants checked there.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoParameters {
    pub system: VideoSystem,
    /// Sample rate in Hz.
    pub sample_rate: f64,
    pub field_width: usize,
    pub field_height: usize,
    pub active_video_start: usize,
    pub active_video_end: usize,
    pub colour_burst_start: usize,
    pub colour_burst_end: usize,
    /// White reference on the 16-bit IRE scale.
    pub white_16b_ire: i32,
    /// Black reference on the 16-bit IRE scale.
    pub black_16b_ire: i32,
    /// Subcarrier frequency in Hz, derived from the system.
    pub fsc: f64,
    pub first_active_frame_line: usize,
    pub last_active_frame_line: usize,
    pub is_widescreen: bool,
    pub number_of_sequential_fields: usize,
    pub is_subcarrier_locked: bool,
    pub is_mapped: bool,
    pub tape_format: Option<String>,
}

impl VideoParameters {
    /// Derive system defaults and validate raw capture values.
    pub fn from_capture(capture: CaptureParameters) -> MetadataResult<Self> {
        let invalid = |message: String| Err(MetadataError::InvalidParameters(message));

        if capture.field_width <= 0 || capture.field_height <= 0 {
            return invalid(format!(
                "field dimensions must be positive ({}x{})",
                capture.field_width, capture.field_height
            ));
        }
        if capture.active_video_start < 0 || capture.active_video_end <= capture.active_video_start
        {
            return invalid(format!(
                "activeVideoEnd ({}) must be greater than activeVideoStart ({})",
                capture.active_video_end, capture.active_video_start
            ));
        }
        if capture.active_video_end > capture.field_width {
            return invalid(format!(
                "activeVideoEnd ({}) exceeds field width ({})",
                capture.active_video_end, capture.field_width
            ));
        }
        if capture.colour_burst_start < 0
            || capture.colour_burst_end < capture.colour_burst_start
            || capture.colour_burst_end > capture.field_width
        {
            return invalid(format!(
                "colour burst bounds {}..{} do not fit the field width ({})",
                capture.colour_burst_start, capture.colour_burst_end, capture.field_width
            ));
        }
        if capture.white_16b_ire <= capture.black_16b_ire {
            return invalid(format!(
                "white level ({}) must be above black level ({})",
                capture.white_16b_ire, capture.black_16b_ire
            ));
        }
        if capture.black_16b_ire < 0 || capture.white_16b_ire > i64::from(u16::MAX) {
            return invalid(format!(
                "IRE levels {}..{} outside the 16-bit sample range",
                capture.black_16b_ire, capture.white_16b_ire
            ));
        }

        let field_width = capture.field_width as usize;
        let field_height = capture.field_height as usize;
        let field_bytes = field_width
            .checked_mul(field_height)
            .and_then(|samples| samples.checked_mul(2));
        let frame_height = field_height.checked_mul(2).map(|lines| lines - 1);
        let (Some(_), Some(frame_height)) = (field_bytes, frame_height) else {
            return invalid(format!(
                "field dimensions {}x{} are too large to address",
                capture.field_width, capture.field_height
            ));
        };

        let (first_active_frame_line, last_active_frame_line) =
            capture.system.active_frame_lines();
        if last_active_frame_line > frame_height {
            return invalid(format!(
                "{} needs {} frame lines but the field height {} gives {}",
                capture.system, last_active_frame_line, field_height, frame_height
            ));
        }

        Ok(Self {
            system: capture.system,
            sample_rate: capture.sample_rate,
            field_width,
            field_height,
            active_video_start: capture.active_video_start as usize,
            active_video_end: capture.active_video_end as usize,
            colour_burst_start: capture.colour_burst_start as usize,
            colour_burst_end: capture.colour_burst_end as usize,
            white_16b_ire: capture.white_16b_ire as i32,
            black_16b_ire: capture.black_16b_ire as i32,
            fsc: capture.system.subcarrier_frequency(),
            first_active_frame_line,
            last_active_frame_line,
            is_widescreen: capture.is_widescreen,
            number_of_sequential_fields: capture.number_of_sequential_fields.max(0) as usize,
            is_subcarrier_locked: capture.is_subcarrier_locked,
            is_mapped: capture.is_mapped,
            tape_format: capture.tape_format,
        })
    }

    /// Samples per field.
    pub fn field_length(&self) -> usize {
        self.field_width * self.field_height
    }

    /// Lines in an interlaced frame built from two fields.
    pub fn frame_height(&self) -> usize {
        self.field_height * 2 - 1
    }

    /// Width of the active picture area.
    pub fn active_width(&self) -> usize {
        self.active_video_end - self.active_video_start
    }

    /// Height of the active picture area.
    pub fn active_height(&self) -> usize {
        self.last_active_frame_line - self.first_active_frame_line
    }

    /// Sample value of one IRE step.
    pub fn ire_step(&self) -> f64 {
        f64::from(self.white_16b_ire - self.black_16b_ire) / 100.0
    }
}

/// Per-field metadata row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldRecord {
    pub seq_no: i64,
    pub is_first_field: bool,
    pub sync_conf: i32,
    pub median_burst_ire: f64,
    pub field_phase_id: i32,
    pub audio_samples: Option<i64>,
    pub disk_loc: Option<f64>,
    pub file_loc: Option<i64>,
    pub decode_faults: Option<i32>,
    pub efm_t_values: Option<i32>,
    pub pad: bool,
}

/// Everything the metadata collaborator provides for one source.
#[derive(Debug, Clone)]
pub struct CaptureMetadata {
    pub parameters: VideoParameters,
    /// Field records in capture order.
    pub fields: Vec<FieldRecord>,
}

impl CaptureMetadata {
    /// Position of the field that starts frame 1.
    ///
    /// Captures may begin on a second field; that field is skipped.
    pub fn first_field_offset(&self) -> usize {
        self.fields
            .iter()
            .position(|f| f.is_first_field)
            .unwrap_or(0)
    }

    /// Number of complete frames described by the field records.
    pub fn frame_count(&self) -> usize {
        self.fields
            .len()
            .saturating_sub(self.first_field_offset())
            / 2
    }

    /// Field positions (0-based, capture order) of a 1-based frame number.
    pub fn frame_field_positions(&self, frame_number: usize) -> Option<(usize, usize)> {
        if frame_number == 0 || frame_number > self.frame_count() {
            return None;
        }
        let first = self.first_field_offset() + 2 * (frame_number - 1);
        Some((first, first + 1))
    }
}
