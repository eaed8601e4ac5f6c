//! JSON metadata sidecar reader (ld-decode layout).

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::types::{CaptureMetadata, CaptureParameters, FieldRecord, VideoParameters, VideoSystem};
use super::{MetadataError, MetadataResult};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct JsonRoot {
    video_parameters: Option<JsonVideoParameters>,
    fields: Vec<JsonField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct JsonVideoParameters {
    system: Option<String>,
    /// Older captures only carry this flag instead of `system`.
    is_source_pal: Option<bool>,
    number_of_sequential_fields: i64,
    field_width: i64,
    field_height: i64,
    sample_rate: f64,
    active_video_start: i64,
    active_video_end: i64,
    colour_burst_start: i64,
    colour_burst_end: i64,
    #[serde(rename = "white16bIre")]
    white_16b_ire: i64,
    #[serde(rename = "black16bIre")]
    black_16b_ire: i64,
    is_mapped: bool,
    is_subcarrier_locked: bool,
    is_widescreen: bool,
    tape_format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct JsonField {
    seq_no: i64,
    is_first_field: bool,
    sync_conf: i32,
    #[serde(rename = "medianBurstIRE")]
    median_burst_ire: f64,
    #[serde(rename = "fieldPhaseID")]
    field_phase_id: i32,
    audio_samples: Option<i64>,
    disk_loc: Option<f64>,
    file_loc: Option<i64>,
    decode_faults: Option<i32>,
    #[serde(rename = "efmTValues")]
    efm_t_values: Option<i32>,
    pad: bool,
}

impl JsonVideoParameters {
    fn system(&self) -> MetadataResult<VideoSystem> {
        match (&self.system, self.is_source_pal) {
            (Some(name), _) => {
                VideoSystem::parse(name).ok_or_else(|| MetadataError::UnknownSystem(name.clone()))
            }
            (None, Some(true)) => Ok(VideoSystem::Pal),
            _ => Ok(VideoSystem::Ntsc),
        }
    }

    fn into_capture(self, field_count: usize) -> MetadataResult<CaptureParameters> {
        let system = self.system()?;
        let number_of_sequential_fields = if self.number_of_sequential_fields > 0 {
            self.number_of_sequential_fields
        } else {
            field_count as i64
        };
        Ok(CaptureParameters {
            system,
            sample_rate: self.sample_rate,
            field_width: self.field_width,
            field_height: self.field_height,
            active_video_start: self.active_video_start,
            active_video_end: self.active_video_end,
            colour_burst_start: self.colour_burst_start,
            colour_burst_end: self.colour_burst_end,
            white_16b_ire: self.white_16b_ire,
            black_16b_ire: self.black_16b_ire,
            number_of_sequential_fields,
            is_subcarrier_locked: self.is_subcarrier_locked,
            is_widescreen: self.is_widescreen,
            is_mapped: self.is_mapped,
            tape_format: self.tape_format.filter(|s| !s.is_empty()),
        })
    }
}

impl From<JsonField> for FieldRecord {
    fn from(f: JsonField) -> Self {
        // Non-positive diagnostics mean "not recorded"
        Self {
            seq_no: f.seq_no,
            is_first_field: f.is_first_field,
            sync_conf: f.sync_conf,
            median_burst_ire: f.median_burst_ire,
            field_phase_id: f.field_phase_id,
            audio_samples: f.audio_samples.filter(|&v| v > 0),
            disk_loc: f.disk_loc.filter(|&v| v > 0.0),
            file_loc: f.file_loc.filter(|&v| v > 0),
            decode_faults: f.decode_faults.filter(|&v| v > 0),
            efm_t_values: f.efm_t_values.filter(|&v| v > 0),
            pad: f.pad,
        }
    }
}

/// Parse JSON sidecar content.
pub fn parse_json(content: &str) -> MetadataResult<CaptureMetadata> {
    let root: JsonRoot = serde_json::from_str(content)?;
    let video = root
        .video_parameters
        .ok_or_else(|| MetadataError::MissingSection("videoParameters".to_string()))?;

    if root.fields.is_empty() {
        return Err(MetadataError::NoFields);
    }

    let capture = video.into_capture(root.fields.len())?;
    let parameters = VideoParameters::from_capture(capture)?;
    let fields = root.fields.into_iter().map(FieldRecord::from).collect();

    Ok(CaptureMetadata { parameters, fields })
}

/// Read a JSON sidecar from disk.
pub fn read_json(path: &Path) -> MetadataResult<CaptureMetadata> {
    let content = fs::read_to_string(path).map_err(|e| MetadataError::read(path, e))?;
    let metadata = parse_json(&content)?;

    tracing::info!(
        "[Metadata] Loaded {} fields from {} (system={}, field={}x{}, active={}..{})",
        metadata.fields.len(),
        path.display(),
        metadata.parameters.system,
        metadata.parameters.field_width,
        metadata.parameters.field_height,
        metadata.parameters.active_video_start,
        metadata.parameters.active_video_end
    );

    Ok(metadata)
}
