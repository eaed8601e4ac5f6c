//! PAL decoders: delay-line and frequency-domain transform.

use std::fmt;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::dsp::{self, Carrier, DecodedField, FieldBuffers, FieldGeometry};
use super::{EngineConfig, EngineKind};
use crate::frame::ComponentFrame;
use crate::metadata::VideoParameters;
use crate::window::{FieldWindow, SourceField};

/// Luma difference, in IRE, below which a sample counts as static.
const STATIC_IRE: f64 = 2.0;

/// Luma/chroma separation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalMode {
    /// Band-pass with vertical delay-line chroma averaging.
    TwoD,
    /// FFT band split per line.
    Transform2D,
    /// FFT band split with temporal chroma averaging.
    Transform3D,
}

impl PalMode {
    fn from_kind(kind: EngineKind) -> Self {
        match kind {
            EngineKind::Transform2D => Self::Transform2D,
            EngineKind::Transform3D => Self::Transform3D,
            _ => Self::TwoD,
        }
    }
}

/// Per-line FFT filter keeping the band around fSC.
struct TransformFilter {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    /// Bins inside the chroma band.
    band: Vec<bool>,
    spectrum: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl TransformFilter {
    fn new(width: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(width);
        let inverse = planner.plan_fft_inverse(width);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        // Chroma occupies fSC +/- fSC/2, i.e. 1/8..3/8 of the sample rate
        let band = (0..width)
            .map(|k| {
                let f = k.min(width - k) as f64 / width as f64;
                (0.125..=0.375).contains(&f)
            })
            .collect();

        Self {
            forward,
            inverse,
            band,
            spectrum: vec![Complex::new(0.0, 0.0); width],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Extract the chroma band of one line.
    fn separate(&mut self, line: &[f64], out: &mut [f64]) {
        let n = line.len();
        // DC never falls in the band, removing it keeps flat lines exact
        let mean = line.iter().sum::<f64>() / n as f64;
        for (bin, &s) in self.spectrum.iter_mut().zip(line) {
            *bin = Complex::new(s - mean, 0.0);
        }

        self.forward
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);
        for (bin, &keep) in self.spectrum.iter_mut().zip(&self.band) {
            if !keep {
                *bin = Complex::new(0.0, 0.0);
            }
        }
        self.inverse
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let scale = 1.0 / n as f64;
        for (o, bin) in out.iter_mut().zip(&self.spectrum) {
            *o = bin.re * scale;
        }
    }
}

impl fmt::Debug for TransformFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformFilter")
            .field("len", &self.spectrum.len())
            .finish()
    }
}

/// Decoder for PAL colour carriers (PAL and PAL-M).
#[derive(Debug)]
pub struct PalDecoder {
    mode: PalMode,
    geometry: FieldGeometry,
    config: EngineConfig,
    buffers: FieldBuffers,
    transform: Option<TransformFilter>,
}

impl PalDecoder {
    pub fn new(kind: EngineKind, params: &VideoParameters, config: EngineConfig) -> Self {
        let mode = PalMode::from_kind(kind);
        let geometry = FieldGeometry::from_parameters(params);
        let transform = match mode {
            PalMode::TwoD => None,
            PalMode::Transform2D | PalMode::Transform3D => {
                Some(TransformFilter::new(geometry.width))
            }
        };
        Self {
            mode,
            geometry,
            config,
            buffers: FieldBuffers::default(),
            transform,
        }
    }

    pub fn mode(&self) -> PalMode {
        self.mode
    }

    /// Decode the window's current frame.
    pub fn decode(&mut self, window: &FieldWindow) -> ComponentFrame {
        let mut frame = ComponentFrame::new(self.geometry.width, self.geometry.frame_height());
        let (first, second) = window.current();

        for (slot, field) in [first, second].into_iter().enumerate() {
            let mut decoded = self.decode_field(field);

            if self.mode == PalMode::Transform3D {
                let mut neighbours = Vec::with_capacity(2);
                for offset in [-1, 1] {
                    if let Some(pair) = window.frame_at(offset) {
                        let other = if slot == 0 { pair.0 } else { pair.1 };
                        neighbours.push(self.decode_field(other));
                    }
                }
                average_static_chroma(&self.geometry, &mut decoded, &neighbours);
            }

            dsp::write_field(&mut frame, &self.geometry, &decoded, slot == 1);
        }
        frame
    }

    fn decode_field(&mut self, field: &SourceField) -> DecodedField {
        let geom = &self.geometry;
        let buffers = &mut self.buffers;
        buffers.load(&field.data, geom);

        match self.transform.as_mut() {
            Some(transform) => {
                for line in 0..geom.lines {
                    let span = line * geom.width..(line + 1) * geom.width;
                    transform.separate(&buffers.samples[span.clone()], &mut buffers.chroma[span]);
                }
            }
            None => dsp::bandpass_field(geom, buffers),
        }

        dsp::demodulate(
            geom,
            &buffers.chroma,
            &mut buffers.i,
            &mut buffers.q,
            &mut buffers.line,
        );
        if self.mode == PalMode::TwoD {
            average_delay_lines(geom, &mut buffers.i, &mut buffers.line);
            average_delay_lines(geom, &mut buffers.q, &mut buffers.line);
        }

        let burst = dsp::measure_burst(geom, &buffers.samples, &mut buffers.line);
        dsp::finish_field(
            Carrier::Pal,
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

/// `(1, 2, 1) / 4` average of demodulated chroma with the lines two above and
/// below, which share the current line's V-switch state.
fn average_delay_lines(geom: &FieldGeometry, plane: &mut [f64], scratch: &mut Vec<f64>) {
    let width = geom.width;
    scratch.clear();
    scratch.extend_from_slice(plane);
    for line in 0..geom.lines {
        let above = if line >= 2 { line - 2 } else { line };
        let below = if line + 2 < geom.lines { line + 2 } else { line };
        for x in 0..width {
            plane[line * width + x] = (scratch[above * width + x]
                + 2.0 * scratch[line * width + x]
                + scratch[below * width + x])
                / 4.0;
        }
    }
}

/// Average chroma with neighbouring frames where the luma has not changed.
fn average_static_chroma(
    geom: &FieldGeometry,
    current: &mut DecodedField,
    neighbours: &[DecodedField],
) {
    if neighbours.is_empty() {
        return;
    }
    let threshold = STATIC_IRE * geom.ire_step;
    for idx in 0..geom.len() {
        let (mut u, mut v, mut n) = (current.u[idx], current.v[idx], 1.0);
        for other in neighbours {
            if (other.y[idx] - current.y[idx]).abs() < threshold {
                u += other.u[idx];
                v += other.v[idx];
                n += 1.0;
            }
        }
        current.u[idx] = u / n;
        current.v[idx] = v / n;
    }
}
