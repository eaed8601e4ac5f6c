//! 4fSC signal processing shared by the decode engines.
//!
//! Samples are taken at four times the subcarrier frequency, so the
//! subcarrier phase of a sample is its absolute position within the field
//! modulo 4.

use std::f64::consts::PI;

use super::EngineConfig;
use crate::frame::ComponentFrame;
use crate::metadata::VideoParameters;

/// Reference sine at 4fSC, indexed by subcarrier phase.
pub(crate) const SIN4: [f64; 4] = [0.0, 1.0, 0.0, -1.0];
/// Reference cosine at 4fSC, indexed by subcarrier phase.
pub(crate) const COS4: [f64; 4] = [1.0, 0.0, -1.0, 0.0];

/// Burst amplitude, in IRE, below which a line counts as burstless.
const BURST_PRESENT_IRE: f64 = 2.0;

/// Colour carrier the chroma is modulated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Carrier {
    Ntsc,
    Pal,
}

/// Field dimensions and calibration used by every engine.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldGeometry {
    pub width: usize,
    pub lines: usize,
    pub burst_start: usize,
    pub burst_end: usize,
    pub ire_step: f64,
}

impl FieldGeometry {
    pub fn from_parameters(params: &VideoParameters) -> Self {
        Self {
            width: params.field_width,
            lines: params.field_height,
            burst_start: params.colour_burst_start,
            burst_end: params.colour_burst_end,
            ire_step: params.ire_step(),
        }
    }

    pub fn len(&self) -> usize {
        self.width * self.lines
    }

    pub fn frame_height(&self) -> usize {
        self.lines * 2 - 1
    }

    #[inline]
    pub fn phase(&self, line: usize, x: usize) -> usize {
        (line * self.width + x) % 4
    }

    pub fn line<'a>(&self, field: &'a [f64], line: usize) -> &'a [f64] {
        &field[line * self.width..(line + 1) * self.width]
    }
}

/// One decoded field in engine sample units.
#[derive(Debug, Clone, Default)]
pub(crate) struct DecodedField {
    pub y: Vec<f64>,
    pub u: Vec<f64>,
    pub v: Vec<f64>,
}

/// Burst measured over one field.
#[derive(Debug, Clone, Default)]
pub(crate) struct Burst {
    /// Mean burst vector over all lines.
    pub mean: (f64, f64),
    /// Burst vector per field line.
    pub lines: Vec<(f64, f64)>,
    pub present: bool,
}

/// Per-engine scratch buffers, reused between fields.
#[derive(Debug, Clone, Default)]
pub(crate) struct FieldBuffers {
    pub samples: Vec<f64>,
    pub chroma: Vec<f64>,
    pub i: Vec<f64>,
    pub q: Vec<f64>,
    pub line: Vec<f64>,
}

impl FieldBuffers {
    /// Load raw samples and size every buffer for the field.
    pub fn load(&mut self, data: &[u16], geometry: &FieldGeometry) {
        to_samples(data, &mut self.samples);
        let len = geometry.len();
        self.chroma.clear();
        self.chroma.resize(len, 0.0);
        self.i.clear();
        self.i.resize(len, 0.0);
        self.q.clear();
        self.q.resize(len, 0.0);
        self.line.clear();
        self.line.resize(geometry.width, 0.0);
    }
}

pub(crate) fn to_samples(data: &[u16], out: &mut Vec<f64>) {
    out.clear();
    out.extend(data.iter().map(|&s| f64::from(s)));
}

/// Horizontal band-pass centred on fSC: `(2s[x] - s[x-2] - s[x+2]) / 4`.
///
/// Unity gain at fSC, zero at DC. Edges are clamped.
pub(crate) fn bandpass(line: &[f64], out: &mut [f64]) {
    let last = line.len().saturating_sub(1);
    for x in 0..line.len() {
        let left = line[x.saturating_sub(2)];
        let right = line[(x + 2).min(last)];
        out[x] = (2.0 * line[x] - left - right) / 4.0;
    }
}

/// Band-pass every line of the loaded samples into the chroma buffer.
pub(crate) fn bandpass_field(geometry: &FieldGeometry, buffers: &mut FieldBuffers) {
    for line in 0..geometry.lines {
        let span = line * geometry.width..(line + 1) * geometry.width;
        bandpass(&buffers.samples[span.clone()], &mut buffers.chroma[span]);
    }
}

/// `[1, 2, 2, 2, 1] / 8` low-pass. Removes the 2fSC demodulation product.
pub(crate) fn lowpass(input: &[f64], out: &mut [f64]) {
    let last = input.len().saturating_sub(1);
    let at = |x: isize| input[x.clamp(0, last as isize) as usize];
    for x in 0..input.len() {
        let c = x as isize;
        out[x] = (at(c - 2) + 2.0 * at(c - 1) + 2.0 * at(c) + 2.0 * at(c + 1) + at(c + 2)) / 8.0;
    }
}

/// Demodulate a field of chroma into in-phase and quadrature components.
pub(crate) fn demodulate(
    geometry: &FieldGeometry,
    chroma: &[f64],
    i: &mut [f64],
    q: &mut [f64],
    line_buf: &mut Vec<f64>,
) {
    let width = geometry.width;
    line_buf.resize(width, 0.0);
    for line in 0..geometry.lines {
        let base = line * width;
        let c = &chroma[base..base + width];

        for x in 0..width {
            line_buf[x] = 2.0 * c[x] * SIN4[geometry.phase(line, x)];
        }
        lowpass(line_buf, &mut i[base..base + width]);

        for x in 0..width {
            line_buf[x] = 2.0 * c[x] * COS4[geometry.phase(line, x)];
        }
        lowpass(line_buf, &mut q[base..base + width]);
    }
}

/// Measure the colour burst on every line of a field.
pub(crate) fn measure_burst(
    geometry: &FieldGeometry,
    samples: &[f64],
    line_buf: &mut Vec<f64>,
) -> Burst {
    let (start, end) = (geometry.burst_start, geometry.burst_end.min(geometry.width));
    if end <= start {
        return Burst {
            lines: vec![(0.0, 0.0); geometry.lines],
            ..Default::default()
        };
    }

    line_buf.resize(geometry.width, 0.0);
    let span = (end - start) as f64;
    let mut lines = Vec::with_capacity(geometry.lines);
    let (mut sum_i, mut sum_q) = (0.0, 0.0);

    for line in 0..geometry.lines {
        bandpass(geometry.line(samples, line), line_buf);
        let (mut bi, mut bq) = (0.0, 0.0);
        for x in start..end {
            let p = geometry.phase(line, x);
            bi += 2.0 * line_buf[x] * SIN4[p];
            bq += 2.0 * line_buf[x] * COS4[p];
        }
        let vector = (bi / span, bq / span);
        sum_i += vector.0;
        sum_q += vector.1;
        lines.push(vector);
    }

    let mean = (sum_i / geometry.lines as f64, sum_q / geometry.lines as f64);
    let present = mean.0.hypot(mean.1) >= BURST_PRESENT_IRE * geometry.ire_step;
    Burst {
        mean,
        lines,
        present,
    }
}

/// Subtract the clipped high-frequency part of a line.
///
/// Detail below `limit` is treated as noise and removed, larger edges pass.
pub(crate) fn reduce_noise(line: &mut [f64], limit: f64, scratch: &mut Vec<f64>) {
    if limit <= 0.0 || line.len() < 3 {
        return;
    }
    let last = line.len() - 1;
    scratch.clear();
    scratch.extend((0..line.len()).map(|x| {
        let left = line[x.saturating_sub(1)];
        let right = line[(x + 1).min(last)];
        ((2.0 * line[x] - left - right) / 4.0).clamp(-limit, limit)
    }));
    for (sample, hp) in line.iter_mut().zip(scratch.iter()) {
        *sample -= hp;
    }
}

/// Turn separated chroma into a decoded field.
///
/// `i`/`q` are the demodulated chroma. They are rotated by the burst
/// correction and the configured phase, scaled by the gain, and for PAL the
/// V-switch is applied per line.
#[allow(clippy::too_many_arguments)]
pub(crate) fn finish_field(
    carrier: Carrier,
    geometry: &FieldGeometry,
    config: &EngineConfig,
    samples: &[f64],
    chroma: &[f64],
    i: &[f64],
    q: &[f64],
    burst: &Burst,
    field_phase_id: i32,
) -> DecodedField {
    let rotation = match carrier {
        Carrier::Ntsc if config.phase_compensation && burst.present => {
            PI - burst.mean.1.atan2(burst.mean.0)
        }
        Carrier::Pal if burst.present => PI - burst.mean.1.atan2(burst.mean.0),
        _ => 0.0,
    };
    let total = rotation + config.chroma_phase.to_radians();
    let (sin_t, cos_t) = total.sin_cos();
    let (sin_r, cos_r) = rotation.sin_cos();
    let gain = config.chroma_gain;

    let width = geometry.width;
    let len = geometry.len();
    let mut out = DecodedField {
        y: Vec::with_capacity(len),
        u: Vec::with_capacity(len),
        v: Vec::with_capacity(len),
    };

    for line in 0..geometry.lines {
        let v_switch = match carrier {
            Carrier::Ntsc => 1.0,
            Carrier::Pal if burst.present => {
                let (bi, bq) = burst.lines[line];
                if bi * sin_r + bq * cos_r >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Carrier::Pal => {
                if (line as i64 + i64::from(field_phase_id)) % 2 == 0 {
                    1.0
                } else {
                    -1.0
                }
            }
        };

        let base = line * width;
        for x in base..base + width {
            out.y.push(samples[x] - chroma[x]);
            out.u.push((i[x] * cos_t - q[x] * sin_t) * gain);
            out.v.push((i[x] * sin_t + q[x] * cos_t) * gain * v_switch);
        }
    }

    let mut scratch = Vec::with_capacity(width);
    let luma_limit = config.luma_nr * geometry.ire_step;
    let chroma_limit = match carrier {
        Carrier::Ntsc => config.chroma_nr * geometry.ire_step,
        Carrier::Pal => 0.0,
    };
    for line in 0..geometry.lines {
        let span = line * width..(line + 1) * width;
        reduce_noise(&mut out.y[span.clone()], luma_limit, &mut scratch);
        reduce_noise(&mut out.u[span.clone()], chroma_limit, &mut scratch);
        reduce_noise(&mut out.v[span], chroma_limit, &mut scratch);
    }

    out
}

/// Copy a decoded field into its frame lines.
pub(crate) fn write_field(
    frame: &mut ComponentFrame,
    geometry: &FieldGeometry,
    field: &DecodedField,
    second: bool,
) {
    let width = geometry.width;
    for line in 0..geometry.lines {
        let frame_line = line * 2 + usize::from(second);
        if frame_line >= frame.height() {
            break;
        }
        let span = line * width..(line + 1) * width;
        frame.y_mut(frame_line).copy_from_slice(&field.y[span.clone()]);
        frame.u_mut(frame_line).copy_from_slice(&field.u[span.clone()]);
        frame.v_mut(frame_line).copy_from_slice(&field.v[span]);
    }
}
