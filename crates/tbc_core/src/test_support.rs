//! Synthetic captures on disk for session and binding tests.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::metadata::VideoSystem;

/// Shape of a synthetic capture.
#[derive(Debug, Clone)]
pub(crate) struct CaptureShape {
    pub system: VideoSystem,
    pub field_width: usize,
    pub field_height: usize,
    pub active_video_start: usize,
    pub active_video_end: usize,
    pub black_16b_ire: i32,
    pub white_16b_ire: i32,
    pub frames: usize,
    /// Capture starts on a second field that belongs to no frame.
    pub leading_second_field: bool,
}

impl CaptureShape {
    /// Narrow NTSC capture: 32 samples by 263 lines per field.
    pub fn ntsc(frames: usize) -> Self {
        Self {
            system: VideoSystem::Ntsc,
            field_width: 32,
            field_height: 263,
            active_video_start: 8,
            active_video_end: 28,
            black_16b_ire: 10000,
            white_16b_ire: 50000,
            frames,
            leading_second_field: false,
        }
    }

    /// Narrow PAL capture: 32 samples by 313 lines per field.
    pub fn pal(frames: usize) -> Self {
        Self {
            system: VideoSystem::Pal,
            field_height: 313,
            ..Self::ntsc(frames)
        }
    }

    fn field_count(&self) -> usize {
        self.frames * 2 + usize::from(self.leading_second_field)
    }
}

/// Write `<dir>/<name>.tbc` and its `<name>.tbc.json` sidecar.
///
/// `sample(position, line, x)` gives every sample, with `position` the
/// field's place in the capture.
pub(crate) fn write_capture(
    dir: &Path,
    name: &str,
    shape: &CaptureShape,
    sample: impl Fn(usize, usize, usize) -> u16,
) -> PathBuf {
    let tbc = dir.join(format!("{name}.tbc"));
    let field_count = shape.field_count();

    let mut bytes = Vec::with_capacity(field_count * shape.field_width * shape.field_height * 2);
    for position in 0..field_count {
        for line in 0..shape.field_height {
            for x in 0..shape.field_width {
                bytes.extend_from_slice(&sample(position, line, x).to_le_bytes());
            }
        }
    }
    fs::write(&tbc, bytes).unwrap();

    let fields: Vec<_> = (0..field_count)
        .map(|position| {
            let is_first_field = if shape.leading_second_field {
                position % 2 == 1
            } else {
                position % 2 == 0
            };
            json!({
                "seqNo": position + 1,
                "isFirstField": is_first_field,
                "syncConf": 100,
                "medianBurstIRE": 20.0,
                "fieldPhaseID": (position % 4) + 1,
            })
        })
        .collect();

    let sidecar = json!({
        "videoParameters": {
            "system": shape.system.name(),
            "numberOfSequentialFields": field_count,
            "fieldWidth": shape.field_width,
            "fieldHeight": shape.field_height,
            "sampleRate": 4.0 * shape.system.subcarrier_frequency(),
            "activeVideoStart": shape.active_video_start,
            "activeVideoEnd": shape.active_video_end,
            "colourBurstStart": 0,
            "colourBurstEnd": 8,
            "white16bIre": shape.white_16b_ire,
            "black16bIre": shape.black_16b_ire,
            "isMapped": false,
            "isSubcarrierLocked": true,
            "isWidescreen": false,
        },
        "fields": fields,
    });
    let mut json_path = tbc.as_os_str().to_owned();
    json_path.push(".json");
    fs::write(PathBuf::from(json_path), sidecar.to_string()).unwrap();

    tbc
}

/// Flat capture at `level`.
pub(crate) fn write_flat_capture(dir: &Path, name: &str, shape: &CaptureShape, level: u16) -> PathBuf {
    write_capture(dir, name, shape, |_, _, _| level)
}
