//! Error types for opening and decoding TBC sources.
//!
//! Errors are split by when they can happen:
//! - [`OpenError`]: fatal to session or binding construction
//! - [`DecodeError`]: fatal to a single frame request only
//!
//! Neither is ever retried internally. TBC sources are local, finite files,
//! so a failure points at a file or data integrity problem.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::metadata::MetadataError;

/// Errors raised while opening a source session or binding two sessions.
#[derive(Error, Debug)]
pub enum OpenError {
    /// No usable metadata sidecar could be loaded for the source.
    #[error("Metadata missing for '{path}': {message}")]
    MetadataMissing { path: PathBuf, message: String },

    /// The metadata loaded but describes an inconsistent geometry.
    #[error("Invalid video parameters: {0}")]
    InvalidParameters(String),

    /// The raw sample stream could not be opened.
    #[error("Failed to open TBC stream '{path}': {source}")]
    StreamOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The selected decode engine could not be configured.
    #[error("Decoder configuration failed: {0}")]
    EngineConfigurationFailed(String),

    /// Decode settings are out of range.
    #[error("Invalid decode settings: {0}")]
    InvalidSettings(String),

    /// Primary and chroma sources have different output dimensions.
    #[error(
        "Luma and chroma sources have mismatched dimensions ({primary_width}x{primary_height} vs {chroma_width}x{chroma_height})"
    )]
    DimensionMismatch {
        primary_width: usize,
        primary_height: usize,
        chroma_width: usize,
        chroma_height: usize,
    },

    /// Primary and chroma sources have different frame counts.
    #[error("Luma and chroma sources have different frame counts ({primary} vs {chroma})")]
    FrameCountMismatch { primary: usize, chroma: usize },

    /// The requested source combination is not supported.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
}

impl OpenError {
    /// Create a metadata missing error.
    pub fn metadata_missing(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MetadataMissing {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid parameters error.
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters(message.into())
    }

    /// Create a stream open error.
    pub fn stream_open_failed(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StreamOpenFailed {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid settings error.
    pub fn invalid_settings(message: impl Into<String>) -> Self {
        Self::InvalidSettings(message.into())
    }

    /// Create an unsupported configuration error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration(message.into())
    }

    /// Convert a metadata loader failure for the source at `path`.
    ///
    /// Parameter validation failures keep their own variant, everything else
    /// means no usable sidecar was found.
    pub fn from_metadata(path: impl Into<PathBuf>, err: MetadataError) -> Self {
        match err {
            MetadataError::InvalidParameters(message) => Self::InvalidParameters(message),
            other => Self::metadata_missing(path, other.to_string()),
        }
    }
}

/// Errors raised by a single frame decode request.
///
/// The session stays usable after any of these.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The session was closed.
    #[error("TBC source is not open")]
    NotOpen,

    /// Frame index outside `[0, frame_count)`.
    #[error("Frame {index} out of range (frame count: {frame_count})")]
    FrameOutOfRange { index: i64, frame_count: usize },

    /// The field window for the frame resolved to nothing.
    #[error("Failed to load fields for frame {frame}")]
    InsufficientFields { frame: i64 },

    /// Reading raw field samples from the stream failed.
    #[error("Failed to read field {seq_no}: {source}")]
    StreamRead {
        seq_no: usize,
        #[source]
        source: io::Error,
    },
}

impl DecodeError {
    /// Create a frame out of range error.
    pub fn out_of_range(index: i64, frame_count: usize) -> Self {
        Self::FrameOutOfRange { index, frame_count }
    }

    /// Create a stream read error.
    pub fn stream_read(seq_no: usize, source: io::Error) -> Self {
        Self::StreamRead { seq_no, source }
    }
}

/// Result type for open-time operations.
pub type OpenResult<T> = Result<T, OpenError>;

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
