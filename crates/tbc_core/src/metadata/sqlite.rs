//! Relational metadata sidecar reader.
//!
//! Reads the `capture` and `field_record` tables written by ld-decode's
//! SQLite exporter. Only capture 1 is read.

use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};

use super::types::{CaptureMetadata, CaptureParameters, FieldRecord, VideoParameters, VideoSystem};
use super::{MetadataError, MetadataResult};

const CAPTURE_QUERY: &str = "SELECT system, video_sample_rate, field_width, field_height, \
     active_video_start, active_video_end, colour_burst_start, colour_burst_end, \
     white_16b_ire, black_16b_ire, is_subcarrier_locked, is_widescreen, \
     number_of_sequential_fields \
     FROM capture WHERE capture_id = 1";

const FIELD_QUERY: &str = "SELECT field_id, is_first_field, sync_conf, median_burst_ire, \
     field_phase_id, audio_samples, disk_loc, file_loc, decode_faults, pad \
     FROM field_record WHERE capture_id = 1 ORDER BY field_id";

fn db_err(e: rusqlite::Error) -> MetadataError {
    MetadataError::Database(e.to_string())
}

fn capture_from_row(row: &Row<'_>) -> rusqlite::Result<(Option<String>, CaptureParameters)> {
    let flag = |idx: usize| -> rusqlite::Result<bool> {
        Ok(row.get::<_, Option<i64>>(idx)?.unwrap_or(0) != 0)
    };
    let int = |idx: usize| -> rusqlite::Result<i64> { Ok(row.get::<_, Option<i64>>(idx)?.unwrap_or(0)) };

    let system: Option<String> = row.get(0)?;
    let capture = CaptureParameters {
        system: VideoSystem::Ntsc,
        sample_rate: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
        field_width: int(2)?,
        field_height: int(3)?,
        active_video_start: int(4)?,
        active_video_end: int(5)?,
        colour_burst_start: int(6)?,
        colour_burst_end: int(7)?,
        white_16b_ire: int(8)?,
        black_16b_ire: int(9)?,
        is_subcarrier_locked: flag(10)?,
        is_widescreen: flag(11)?,
        number_of_sequential_fields: int(12)?,
        is_mapped: false,
        tape_format: None,
    };
    Ok((system, capture))
}

fn field_from_row(row: &Row<'_>) -> rusqlite::Result<FieldRecord> {
    // field_id is 0-based, sequence numbers are 1-based
    let field_id: i64 = row.get(0)?;
    Ok(FieldRecord {
        seq_no: field_id + 1,
        is_first_field: row.get::<_, Option<i64>>(1)?.unwrap_or(0) != 0,
        sync_conf: row.get::<_, Option<i32>>(2)?.unwrap_or(100),
        median_burst_ire: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
        field_phase_id: row.get::<_, Option<i32>>(4)?.unwrap_or(0),
        audio_samples: row.get::<_, Option<i64>>(5)?.filter(|&v| v > 0),
        disk_loc: row.get::<_, Option<f64>>(6)?.filter(|&v| v > 0.0),
        file_loc: row.get::<_, Option<i64>>(7)?.filter(|&v| v > 0),
        decode_faults: row.get::<_, Option<i32>>(8)?.filter(|&v| v > 0),
        efm_t_values: None,
        pad: row.get::<_, Option<i64>>(9)?.unwrap_or(0) != 0,
    })
}

/// Read a relational sidecar from disk.
pub fn read_sqlite(path: &Path) -> MetadataResult<CaptureMetadata> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(db_err)?;

    let (system_name, mut capture) = conn
        .query_row(CAPTURE_QUERY, [], capture_from_row)
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| MetadataError::MissingSection("capture".to_string()))?;

    if let Some(name) = system_name {
        capture.system =
            VideoSystem::parse(&name).ok_or_else(|| MetadataError::UnknownSystem(name.clone()))?;
    }

    let mut stmt = conn.prepare(FIELD_QUERY).map_err(db_err)?;
    let fields = stmt
        .query_map([], field_from_row)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;

    if fields.is_empty() {
        return Err(MetadataError::NoFields);
    }
    if capture.number_of_sequential_fields <= 0 {
        capture.number_of_sequential_fields = fields.len() as i64;
    }

    let parameters = VideoParameters::from_capture(capture)?;

    tracing::info!(
        "[Metadata] Loaded {} fields from {} (system={}, field={}x{}, active={}..{})",
        fields.len(),
        path.display(),
        parameters.system,
        parameters.field_width,
        parameters.field_height,
        parameters.active_video_start,
        parameters.active_video_end
    );

    Ok(CaptureMetadata { parameters, fields })
}
