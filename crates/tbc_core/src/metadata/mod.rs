//! Metadata sidecar loading.
//!
//! Every `.tbc` capture comes with a sidecar describing its geometry and
//! calibration plus one row per field. This module provides:
//! - [`MetadataLoader`]: the seam sessions load metadata through
//! - [`SidecarLoader`]: the default loader, resolving `.db` / `.json` files
//!   next to the capture
//! - the parameter and field record types
//!
//! # Sidecar resolution
//!
//! For `capture.tbc` the loader tries, in order:
//! 1. `capture.db`, then `capture.tbc.db` (relational, `sqlite` feature)
//! 2. `capture.json`, then `capture.tbc.json`

mod json;
#[cfg(feature = "sqlite")]
mod sqlite;
mod types;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use json::{parse_json, read_json};
#[cfg(feature = "sqlite")]
pub use sqlite::read_sqlite;
pub use types::{CaptureMetadata, CaptureParameters, FieldRecord, VideoParameters, VideoSystem};

/// Errors that can occur while loading metadata.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// No sidecar file exists for the source.
    #[error("Could not find metadata file (.db or .json) for: {0}")]
    NotFound(PathBuf),

    /// A relational sidecar exists but relational support is not compiled in.
    #[error("Relational metadata '{0}' requires the `sqlite` feature")]
    RelationalUnsupported(PathBuf),

    /// Failed to read the sidecar file.
    #[error("Failed to read metadata '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON parse error.
    #[error("Failed to parse JSON metadata: {0}")]
    Json(#[from] serde_json::Error),

    /// Relational database error.
    #[error("Failed to read relational metadata: {0}")]
    Database(String),

    /// Required section missing from the sidecar.
    #[error("Metadata is missing the '{0}' section")]
    MissingSection(String),

    /// The sidecar names a video system this crate does not know.
    #[error("Unknown video system '{0}'")]
    UnknownSystem(String),

    /// The sidecar has no field records.
    #[error("No field records found in metadata")]
    NoFields,

    /// Capture values are inconsistent.
    #[error("{0}")]
    InvalidParameters(String),
}

impl MetadataError {
    /// Create a read error.
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Source of parameter and field records for a capture.
///
/// Implementations must be idempotent: loading the same source twice yields
/// the same records.
pub trait MetadataLoader: Send + Sync {
    /// Load metadata for the capture at `source`.
    fn load(&self, source: &Path) -> MetadataResult<CaptureMetadata>;
}

/// Kind of sidecar found next to a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sidecar {
    /// Relational (SQLite) sidecar.
    Relational(PathBuf),
    /// Structured text (JSON) sidecar.
    Json(PathBuf),
}

/// Default loader reading sidecars stored next to the capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarLoader;

impl SidecarLoader {
    /// Create a sidecar loader.
    pub fn new() -> Self {
        Self
    }

    /// Find the sidecars available for `source`, in preference order.
    pub fn resolve(source: &Path) -> Vec<Sidecar> {
        let stem_path = source.with_extension("");
        let with_suffix = |suffix: &str| {
            let mut name = source.as_os_str().to_owned();
            name.push(suffix);
            PathBuf::from(name)
        };
        let stem_with = |suffix: &str| {
            let mut name = stem_path.as_os_str().to_owned();
            name.push(suffix);
            PathBuf::from(name)
        };

        let relational = [stem_with(".db"), with_suffix(".db")]
            .into_iter()
            .map(Sidecar::Relational);
        let json = [stem_with(".json"), with_suffix(".json"), stem_with(".tbc.json")]
            .into_iter()
            .map(Sidecar::Json);

        let mut found: Vec<Sidecar> = Vec::new();
        for candidate in relational.chain(json) {
            let path = match &candidate {
                Sidecar::Relational(p) | Sidecar::Json(p) => p,
            };
            if path.exists() && !found.contains(&candidate) {
                found.push(candidate);
            }
        }
        found
    }
}

impl MetadataLoader for SidecarLoader {
    fn load(&self, source: &Path) -> MetadataResult<CaptureMetadata> {
        let candidates = Self::resolve(source);
        #[cfg_attr(feature = "sqlite", allow(unused_mut))]
        let mut skipped_relational: Option<PathBuf> = None;

        for candidate in candidates {
            match candidate {
                Sidecar::Relational(path) => {
                    #[cfg(feature = "sqlite")]
                    {
                        return read_sqlite(&path);
                    }
                    #[cfg(not(feature = "sqlite"))]
                    {
                        tracing::debug!(
                            "[Metadata] Skipping relational sidecar {} (sqlite feature disabled)",
                            path.display()
                        );
                        skipped_relational.get_or_insert(path);
                    }
                }
                Sidecar::Json(path) => {
                    tracing::info!("[Metadata] Found JSON metadata: {}", path.display());
                    return read_json(&path);
                }
            }
        }

        match skipped_relational {
            Some(path) => Err(MetadataError::RelationalUnsupported(path)),
            None => Err(MetadataError::NotFound(source.with_extension(""))),
        }
    }
}
