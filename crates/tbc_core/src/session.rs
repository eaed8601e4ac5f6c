//! One opened TBC source.
//!
//! A [`SourceSession`] owns the capture metadata, the raw sample stream and
//! the single decode engine chosen for the source. Decode calls are
//! serialized behind one lock: engines keep scratch state between calls, so
//! concurrent callers block until the current decode finishes.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::Settings;
use crate::engine::{select_engine, Engine, EngineKind, EngineSelection};
use crate::error::{DecodeError, DecodeResult, OpenError, OpenResult};
use crate::frame::ComponentFrame;
use crate::geometry::{self, OutputGeometry, Rational};
use crate::metadata::{CaptureMetadata, MetadataLoader, SidecarLoader, VideoParameters, VideoSystem};
use crate::stream::{FieldReader, TbcStream};
use crate::window::FieldWindowLoader;

/// Resources released by [`SourceSession::close`].
#[derive(Debug)]
struct DecodeState {
    stream: TbcStream,
    engine: Engine,
}

/// An opened source ready to decode frames.
#[derive(Debug)]
pub struct SourceSession {
    path: PathBuf,
    metadata: CaptureMetadata,
    selection: EngineSelection,
    geometry: OutputGeometry,
    loader: FieldWindowLoader,
    state: Mutex<Option<DecodeState>>,
}

impl SourceSession {
    /// Open a source using the sidecar next to it.
    pub fn open(path: &Path, settings: &Settings) -> OpenResult<Self> {
        Self::open_with(&SidecarLoader::new(), path, settings)
    }

    /// Open a source with a custom metadata loader.
    pub fn open_with(
        loader: &dyn MetadataLoader,
        path: &Path,
        settings: &Settings,
    ) -> OpenResult<Self> {
        settings.validate().map_err(OpenError::invalid_settings)?;

        let metadata = loader
            .load(path)
            .map_err(|e| OpenError::from_metadata(path, e))?;
        let params = &metadata.parameters;

        let stream = TbcStream::open(path, params.field_length(), params.field_width)
            .map_err(|e| OpenError::stream_open_failed(path, e))?;
        if stream.field_count() < metadata.fields.len() {
            tracing::warn!(
                "[TbcSource] {} holds {} fields but metadata lists {}",
                path.display(),
                stream.field_count(),
                metadata.fields.len()
            );
        }

        let selection = select_engine(settings.decode.engine, params.system);
        let engine = Engine::configure(&selection, params, &settings.decode.engine_config())?;
        let geometry = OutputGeometry::from_parameters(params, settings.output.padding_multiple);
        let loader = FieldWindowLoader::new(selection.margins, settings.decode.reverse_fields);

        tracing::info!(
            "[TbcSource] Opened {} ({}, {} frames, engine {}, active {}x{}, output {}x{})",
            path.display(),
            params.system,
            metadata.frame_count(),
            selection.kind,
            geometry.active_width,
            geometry.active_height,
            geometry.output_width,
            geometry.output_height
        );

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            selection,
            geometry,
            loader,
            state: Mutex::new(Some(DecodeState { stream, engine })),
        })
    }

    /// Decode a zero-based frame index into native-unit component planes.
    ///
    /// Blocks while another decode on this session is in progress.
    pub fn decode_frame(&self, frame_index: i64) -> DecodeResult<ComponentFrame> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(DecodeError::NotOpen)?;

        let frame_count = self.frame_count();
        if frame_index < 0 || frame_index as u64 >= frame_count as u64 {
            return Err(DecodeError::out_of_range(frame_index, frame_count));
        }

        let window = self
            .loader
            .resolve_window(frame_index, &self.metadata, &mut state.stream)?;
        Ok(state.engine.decode(&window))
    }

    /// Release the stream and engine. Later decodes fail with `NotOpen`.
    pub fn close(&self) {
        if self.state.lock().take().is_some() {
            tracing::debug!("[TbcSource] Closed {}", self.path.display());
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &CaptureMetadata {
        &self.metadata
    }

    pub fn parameters(&self) -> &VideoParameters {
        &self.metadata.parameters
    }

    pub fn system(&self) -> VideoSystem {
        self.metadata.parameters.system
    }

    /// NTSC and PAL-M are NTSC-family.
    pub fn is_ntsc_family(&self) -> bool {
        self.system().is_ntsc_family()
    }

    pub fn is_widescreen(&self) -> bool {
        self.metadata.parameters.is_widescreen
    }

    pub fn black_level(&self) -> i32 {
        self.metadata.parameters.black_16b_ire
    }

    pub fn white_level(&self) -> i32 {
        self.metadata.parameters.white_16b_ire
    }

    pub fn geometry(&self) -> &OutputGeometry {
        &self.geometry
    }

    pub fn active_width(&self) -> usize {
        self.geometry.active_width
    }

    pub fn active_height(&self) -> usize {
        self.geometry.active_height
    }

    pub fn output_width(&self) -> usize {
        self.geometry.output_width
    }

    pub fn output_height(&self) -> usize {
        self.geometry.output_height
    }

    /// First active scanline of a frame; its parity gives field dominance.
    pub fn first_active_frame_line(&self) -> usize {
        self.metadata.parameters.first_active_frame_line
    }

    pub fn active_video_start(&self) -> usize {
        self.metadata.parameters.active_video_start
    }

    pub fn frame_count(&self) -> usize {
        self.metadata.frame_count()
    }

    /// Native frame rate of the source's standard.
    pub fn frame_rate(&self) -> Rational {
        geometry::frame_rate(self.system())
    }

    /// Resolved engine, never `Auto`.
    pub fn engine_kind(&self) -> EngineKind {
        self.selection.kind
    }

    pub fn selection(&self) -> &EngineSelection {
        &self.selection
    }

    pub fn is_mono(&self) -> bool {
        self.selection.kind == EngineKind::Mono
    }
}
