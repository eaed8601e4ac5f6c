//! Conversion of decoded component frames into normalized float planes.
//!
//! Luma becomes `[0, 1]` relative to the black and white levels, colour
//! difference becomes roughly `[-0.5, 0.5]`. Everything outside the active
//! picture is filled with 0.0.

use rayon::prelude::*;

use crate::frame::ComponentFrame;
use crate::geometry::OutputGeometry;

// Y'CbCr scaling [Poynton ch25 p305] [BT.601-7 sec 2.5.3]
const C_SCALE: f64 = 112.0 * 256.0;
const ONE_MINUS_KB: f64 = 1.0 - 0.114;
const ONE_MINUS_KR: f64 = 1.0 - 0.299;
// [Poynton eq 28.1 p336]
#[allow(clippy::excessive_precision)]
const KB: f64 = 0.49211104112248356308804691718185;
#[allow(clippy::excessive_precision)]
const KR: f64 = 0.87728321993817866838972487283129;

/// Neutral value for padding on every plane.
pub const NEUTRAL: f32 = 0.0;

/// Sample-to-float scale factors for one primary source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub y_offset: f64,
    pub y_scale: f64,
    pub cb_scale: f64,
    pub cb_norm: f64,
    pub cr_scale: f64,
    pub cr_norm: f64,
}

impl ColorScale {
    /// Scale factors for the given 16-bit black and white levels.
    pub fn from_levels(black_16b_ire: i32, white_16b_ire: i32) -> Self {
        let y_offset = f64::from(black_16b_ire);
        let range = f64::from(white_16b_ire) - y_offset;
        Self {
            y_offset,
            y_scale: 1.0 / range,
            cb_scale: (C_SCALE / (ONE_MINUS_KB * KB)) / range,
            cb_norm: 1.0 / (2.0 * C_SCALE / (ONE_MINUS_KB * KB)),
            cr_scale: (C_SCALE / (ONE_MINUS_KR * KR)) / range,
            cr_norm: 1.0 / (2.0 * C_SCALE / (ONE_MINUS_KR * KR)),
        }
    }

    #[inline]
    pub fn luma(&self, sample: f64) -> f32 {
        ((sample - self.y_offset) * self.y_scale) as f32
    }

    #[inline]
    pub fn cb(&self, sample: f64) -> f32 {
        (sample * self.cb_scale * self.cb_norm) as f32
    }

    #[inline]
    pub fn cr(&self, sample: f64) -> f32 {
        (sample * self.cr_scale * self.cr_norm) as f32
    }
}

/// A decoded frame together with the offsets of its active picture.
#[derive(Debug, Clone, Copy)]
pub struct PlaneSource<'a> {
    pub frame: &'a ComponentFrame,
    pub first_active_line: usize,
    pub active_video_start: usize,
}

impl<'a> PlaneSource<'a> {
    /// Active samples of output row `row` from one plane, if in bounds.
    fn row(&self, plane: &'a [f64], row: usize, width: usize) -> Option<&'a [f64]> {
        let line = self.first_active_line + row;
        let end = self.active_video_start + width;
        if line >= self.frame.height() || end > self.frame.width() {
            return None;
        }
        let base = line * self.frame.width();
        plane.get(base + self.active_video_start..base + end)
    }
}

/// Normalized float planes, row-major with stride equal to `width`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFrame {
    pub width: usize,
    pub height: usize,
    pub y: Vec<f32>,
    /// `None` for grey output.
    pub u: Option<Vec<f32>>,
    pub v: Option<Vec<f32>>,
}

impl OutputFrame {
    pub fn is_mono(&self) -> bool {
        self.u.is_none()
    }

    /// Luma row.
    pub fn y_row(&self, row: usize) -> &[f32] {
        &self.y[row * self.width..(row + 1) * self.width]
    }
}

/// Build an output frame from a luma source and an optional chroma source.
///
/// Without a chroma source only the Y plane is produced. Rows are converted
/// in parallel; each output sample depends only on its input sample.
pub fn composite(
    luma: &PlaneSource<'_>,
    chroma: Option<&PlaneSource<'_>>,
    geometry: &OutputGeometry,
    scale: &ColorScale,
) -> OutputFrame {
    let width = geometry.output_width;
    let height = geometry.output_height;
    let active_width = geometry.active_width.min(width);
    let active_height = geometry.active_height.min(height);

    let mut y = vec![NEUTRAL; width * height];
    if width > 0 {
        y.par_chunks_mut(width).enumerate().for_each(|(row, out)| {
            if row >= active_height {
                return;
            }
            if let Some(src) = luma.row(luma.frame.y_plane(), row, active_width) {
                for (o, &s) in out.iter_mut().zip(src) {
                    *o = scale.luma(s);
                }
            }
        });
    }

    let (u, v) = match chroma {
        Some(source) => {
            let mut u = vec![NEUTRAL; width * height];
            let mut v = vec![NEUTRAL; width * height];
            if width > 0 {
                u.par_chunks_mut(width)
                    .zip(v.par_chunks_mut(width))
                    .enumerate()
                    .for_each(|(row, (u_out, v_out))| {
                        if row >= active_height {
                            return;
                        }
                        let u_src = source.row(source.frame.u_plane(), row, active_width);
                        let v_src = source.row(source.frame.v_plane(), row, active_width);
                        if let (Some(u_src), Some(v_src)) = (u_src, v_src) {
                            for ((uo, vo), (&us, &vs)) in u_out
                                .iter_mut()
                                .zip(v_out.iter_mut())
                                .zip(u_src.iter().zip(v_src))
                            {
                                *uo = scale.cb(us);
                                *vo = scale.cr(vs);
                            }
                        }
                    });
            }
            (Some(u), Some(v))
        }
        None => (None, None),
    };

    OutputFrame {
        width,
        height,
        y,
        u,
        v,
    }
}
