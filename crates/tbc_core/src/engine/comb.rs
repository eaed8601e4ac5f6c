//! NTSC comb filter decoders.

use super::dsp::{self, Carrier, DecodedField, FieldBuffers, FieldGeometry};
use super::{EngineConfig, EngineKind};
use crate::frame::ComponentFrame;
use crate::metadata::VideoParameters;
use crate::window::{FieldWindow, SourceField};

/// Luma difference, in IRE, at which the adaptive comb fully trusts 2D.
const MOTION_IRE: f64 = 10.0;

/// Luma/chroma separation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombMode {
    /// Horizontal band-pass only.
    OneD,
    /// Line comb within the field.
    TwoD,
    /// Frame comb across the neighbouring frames.
    ThreeD { adaptive: bool },
}

impl CombMode {
    fn from_kind(kind: EngineKind) -> Self {
        match kind {
            EngineKind::Ntsc1D => Self::OneD,
            EngineKind::Ntsc3D => Self::ThreeD { adaptive: true },
            EngineKind::Ntsc3DNoAdapt => Self::ThreeD { adaptive: false },
            _ => Self::TwoD,
        }
    }
}

/// Comb filter decoder for NTSC colour carriers.
#[derive(Debug)]
pub struct CombDecoder {
    mode: CombMode,
    geometry: FieldGeometry,
    config: EngineConfig,
    buffers: FieldBuffers,
    previous: Vec<f64>,
    next: Vec<f64>,
}

impl CombDecoder {
    pub fn new(kind: EngineKind, params: &VideoParameters, config: EngineConfig) -> Self {
        Self {
            mode: CombMode::from_kind(kind),
            geometry: FieldGeometry::from_parameters(params),
            config,
            buffers: FieldBuffers::default(),
            previous: Vec::new(),
            next: Vec::new(),
        }
    }

    pub fn mode(&self) -> CombMode {
        self.mode
    }

    /// Decode the window's current frame.
    pub fn decode(&mut self, window: &FieldWindow) -> ComponentFrame {
        let mut frame = ComponentFrame::new(self.geometry.width, self.geometry.frame_height());
        let (first, second) = window.current();
        let previous = window.frame_at(-1);
        let next = window.frame_at(1);

        for (slot, field) in [first, second].into_iter().enumerate() {
            let neighbours = match (previous, next) {
                (Some(p), Some(n)) => Some((pick(p, slot), pick(n, slot))),
                _ => None,
            };
            let decoded = self.decode_field(field, neighbours);
            dsp::write_field(&mut frame, &self.geometry, &decoded, slot == 1);
        }
        frame
    }

    fn decode_field(
        &mut self,
        field: &SourceField,
        neighbours: Option<(&SourceField, &SourceField)>,
    ) -> DecodedField {
        let geom = &self.geometry;
        self.buffers.load(&field.data, geom);

        match (self.mode, neighbours) {
            (CombMode::OneD, _) => dsp::bandpass_field(geom, &mut self.buffers),
            (CombMode::ThreeD { adaptive }, Some((p, n))) => {
                dsp::to_samples(&p.data, &mut self.previous);
                dsp::to_samples(&n.data, &mut self.next);
                separate_3d(
                    geom,
                    &mut self.buffers,
                    &self.previous,
                    &self.next,
                    adaptive,
                );
            }
            _ => separate_2d(geom, &mut self.buffers),
        }

        let buffers = &mut self.buffers;
        dsp::demodulate(
            geom,
            &buffers.chroma,
            &mut buffers.i,
            &mut buffers.q,
            &mut buffers.line,
        );
        let burst = dsp::measure_burst(geom, &buffers.samples, &mut buffers.line);
        dsp::finish_field(
            Carrier::Ntsc,
            geom,
            &self.config,
            &buffers.samples,
            &buffers.chroma,
            &buffers.i,
            &buffers.q,
            &burst,
            field.record.field_phase_id,
        )
    }
}

fn pick<'a>(pair: (&'a SourceField, &'a SourceField), slot: usize) -> &'a SourceField {
    if slot == 0 {
        pair.0
    } else {
        pair.1
    }
}

/// Vertical high-pass within the field, band-limited horizontally.
///
/// Adjacent NTSC lines carry inverted chroma, so the vertical difference
/// keeps chroma and cancels luma that is constant across lines.
fn separate_2d(geom: &FieldGeometry, buffers: &mut FieldBuffers) {
    let width = geom.width;
    let last_line = geom.lines - 1;
    let mut combed = vec![0.0; width];

    for line in 0..geom.lines {
        let above = geom.line(&buffers.samples, line.saturating_sub(1));
        let current = geom.line(&buffers.samples, line);
        let below = geom.line(&buffers.samples, (line + 1).min(last_line));
        for x in 0..width {
            combed[x] = (2.0 * current[x] - above[x] - below[x]) / 4.0;
        }
        let span = line * width..(line + 1) * width;
        dsp::bandpass(&combed, &mut buffers.chroma[span]);
    }
}

/// Frame comb against the same field of the neighbouring frames.
///
/// Chroma inverts from frame to frame. In adaptive mode the line comb is
/// blended in where the neighbouring frames disagree.
fn separate_3d(
    geom: &FieldGeometry,
    buffers: &mut FieldBuffers,
    previous: &[f64],
    next: &[f64],
    adaptive: bool,
) {
    if adaptive {
        separate_2d(geom, buffers);
    }
    let motion_scale = 1.0 / (MOTION_IRE * geom.ire_step);

    for idx in 0..geom.len() {
        let s = buffers.samples[idx];
        let c3d = (2.0 * s - previous[idx] - next[idx]) / 4.0;
        buffers.chroma[idx] = if adaptive {
            let k = ((previous[idx] - next[idx]).abs() * motion_scale).clamp(0.0, 1.0);
            (1.0 - k) * c3d + k * buffers.chroma[idx]
        } else {
            c3d
        };
    }
}
