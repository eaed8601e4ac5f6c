//! Output geometry and display metadata.
//!
//! Everything here is a pure function of a source's [`VideoParameters`]:
//! padded output dimensions, frame rate, sample aspect ratio, field
//! dominance and colour description.

use std::fmt;

use crate::metadata::{VideoParameters, VideoSystem};

/// Reduced rational number with a positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i64,
    pub den: i64,
}

impl Rational {
    /// Create a reduced rational. `den` must be non-zero.
    pub fn new(num: i64, den: i64) -> Self {
        let sign = if den < 0 { -1 } else { 1 };
        let divisor = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1) as i64;
        Self {
            num: sign * num / divisor,
            den: sign * den / divisor,
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Reciprocal, e.g. frame duration from frame rate.
    pub fn recip(&self) -> Self {
        Self::new(self.den, self.num)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Active picture size and the padded size handed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputGeometry {
    pub active_width: usize,
    pub active_height: usize,
    pub output_width: usize,
    pub output_height: usize,
}

impl OutputGeometry {
    /// Pad active dimensions up to a multiple of `padding_multiple`.
    ///
    /// A multiple of 0 disables padding.
    pub fn new(active_width: usize, active_height: usize, padding_multiple: usize) -> Self {
        Self {
            active_width,
            active_height,
            output_width: pad_to(active_width, padding_multiple),
            output_height: pad_to(active_height, padding_multiple),
        }
    }

    pub fn from_parameters(params: &VideoParameters, padding_multiple: usize) -> Self {
        Self::new(params.active_width(), params.active_height(), padding_multiple)
    }

    pub fn is_padded(&self) -> bool {
        self.output_width != self.active_width || self.output_height != self.active_height
    }
}

fn pad_to(value: usize, multiple: usize) -> usize {
    if multiple == 0 {
        value
    } else {
        value.div_ceil(multiple) * multiple
    }
}

/// Native frame rate of a video standard.
pub fn frame_rate(system: VideoSystem) -> Rational {
    if system.is_ntsc_family() {
        Rational::new(30000, 1001)
    } else {
        Rational::new(25, 1)
    }
}

/// Sample aspect ratio of the active picture (EBU R92 / SMPTE 170M sampling).
pub fn sample_aspect_ratio(system: VideoSystem, widescreen: bool) -> Rational {
    match (system.is_ntsc_family(), widescreen) {
        (false, false) => Rational::new(259, 311),
        (false, true) => Rational::new(865, 779),
        (true, false) => Rational::new(352, 413),
        (true, true) => Rational::new(25, 22),
    }
}

/// Which field of a frame is displayed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDominance {
    BottomFieldFirst,
    TopFieldFirst,
}

impl FieldDominance {
    /// An odd first active frame line puts the bottom field on top.
    pub fn from_first_active_line(first_active_frame_line: usize) -> Self {
        if first_active_frame_line % 2 == 1 {
            Self::BottomFieldFirst
        } else {
            Self::TopFieldFirst
        }
    }

    /// `_FieldBased` frame property value.
    pub fn field_based(&self) -> i64 {
        match self {
            Self::BottomFieldFirst => 1,
            Self::TopFieldFirst => 2,
        }
    }
}

/// Colour description frame properties (H.273 code points).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorDescription {
    pub primaries: i64,
    pub matrix: i64,
    pub transfer: i64,
    /// AviSynth-style `_ColorRange`, 1 = limited.
    pub color_range: i64,
    /// H.273 `_Range`, 0 = limited.
    pub range: i64,
}

impl ColorDescription {
    /// SMPTE 170M for 525-line standards, BT.470BG otherwise.
    pub fn for_system(system: VideoSystem) -> Self {
        let code = if system.is_ntsc_family() { 6 } else { 5 };
        Self {
            primaries: code,
            matrix: code,
            transfer: 1,
            color_range: 1,
            range: 0,
        }
    }
}

/// Display properties attached to every output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameProps {
    /// Frame duration in seconds.
    pub duration: Rational,
    pub sample_aspect_ratio: Rational,
    pub field_dominance: FieldDominance,
    pub color: ColorDescription,
}

impl FrameProps {
    pub fn for_parameters(params: &VideoParameters, frame_rate: Rational) -> Self {
        Self {
            duration: frame_rate.recip(),
            sample_aspect_ratio: sample_aspect_ratio(params.system, params.is_widescreen),
            field_dominance: FieldDominance::from_first_active_line(
                params.first_active_frame_line,
            ),
            color: ColorDescription::for_system(params.system),
        }
    }
}

/// Retimes a source to a different frame rate by dropping or repeating
/// whole frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRateOverride {
    native: Rational,
    target: Rational,
}

impl FrameRateOverride {
    /// Build an override. Returns `None` when `fps_num <= 0` or
    /// `fps_den < 1`.
    pub fn new(native: Rational, fps_num: i64, fps_den: i64) -> Option<Self> {
        if fps_num <= 0 || fps_den < 1 {
            return None;
        }
        Some(Self {
            native,
            target: Rational::new(fps_num, fps_den),
        })
    }

    pub fn target(&self) -> Rational {
        self.target
    }

    /// Frame count at the target rate: `n * target / native`, rounded half
    /// up, at least 1.
    pub fn frame_count(&self, native_count: usize) -> usize {
        let num = native_count as i128 * i128::from(self.target.num) * i128::from(self.native.den);
        let den = i128::from(self.target.den) * i128::from(self.native.num);
        let rounded = (2 * num + den) / (2 * den);
        rounded.max(1) as usize
    }

    /// Source frame shown at output frame `n`.
    pub fn source_frame(&self, n: usize, native_count: usize) -> usize {
        let num = n as i128 * i128::from(self.native.num) * i128::from(self.target.den);
        let den = i128::from(self.native.den) * i128::from(self.target.num);
        let frame = (num / den) as usize;
        frame.min(native_count.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rationals_are_reduced() {
        assert_eq!(Rational::new(50, 2), Rational { num: 25, den: 1 });
        assert_eq!(Rational::new(60000, 2002), Rational { num: 30000, den: 1001 });
        assert_eq!(Rational::new(1, -2), Rational { num: -1, den: 2 });
        assert_eq!(Rational::new(30000, 1001).recip().to_string(), "1001/30000");
    }

    #[test]
    fn padding_rounds_up_to_multiple() {
        for m in 1..=16usize {
            for active in [1usize, 485, 576, 760, 922] {
                let g = OutputGeometry::new(active, active, m);
                assert_eq!(g.output_width % m, 0);
                assert!(g.output_width >= active);
                assert!(g.output_width - active < m);
                assert_eq!(g.output_height, g.output_width);
            }
        }
    }

    #[test]
    fn zero_padding_keeps_active_size() {
        let g = OutputGeometry::new(760, 485, 0);
        assert_eq!((g.output_width, g.output_height), (760, 485));
        assert!(!g.is_padded());

        let g = OutputGeometry::new(760, 485, 8);
        assert_eq!((g.output_width, g.output_height), (760, 488));
        assert!(g.is_padded());
    }

    #[test]
    fn frame_rates_follow_line_count() {
        assert_eq!(frame_rate(VideoSystem::Ntsc), Rational::new(30000, 1001));
        assert_eq!(frame_rate(VideoSystem::PalM), Rational::new(30000, 1001));
        assert_eq!(frame_rate(VideoSystem::Pal), Rational::new(25, 1));
    }

    #[test]
    fn aspect_ratio_table() {
        assert_eq!(sample_aspect_ratio(VideoSystem::Pal, false), Rational::new(259, 311));
        assert_eq!(sample_aspect_ratio(VideoSystem::Pal, true), Rational::new(865, 779));
        assert_eq!(sample_aspect_ratio(VideoSystem::Ntsc, false), Rational::new(352, 413));
        assert_eq!(sample_aspect_ratio(VideoSystem::PalM, true), Rational::new(25, 22));
    }

    #[test]
    fn field_dominance_from_parity() {
        assert_eq!(FieldDominance::from_first_active_line(43).field_based(), 1);
        assert_eq!(FieldDominance::from_first_active_line(44).field_based(), 2);
        assert_eq!(FieldDominance::from_first_active_line(40).field_based(), 2);
    }

    #[test]
    fn colour_description_by_standard() {
        let ntsc = ColorDescription::for_system(VideoSystem::Ntsc);
        assert_eq!((ntsc.primaries, ntsc.matrix), (6, 6));
        let palm = ColorDescription::for_system(VideoSystem::PalM);
        assert_eq!(palm.matrix, 6);
        let pal = ColorDescription::for_system(VideoSystem::Pal);
        assert_eq!((pal.primaries, pal.matrix, pal.transfer), (5, 5, 1));
        assert_eq!((pal.color_range, pal.range), (1, 0));
    }

    #[test]
    fn fps_override_counts_round_half_up() {
        let pal = FrameRateOverride::new(Rational::new(25, 1), 50, 1).unwrap();
        assert_eq!(pal.frame_count(100), 200);

        // 3 frames at 25 -> 3 * 12.5 / 25 = 1.5 -> 2
        let half = FrameRateOverride::new(Rational::new(25, 1), 25, 2).unwrap();
        assert_eq!(half.frame_count(3), 2);
        assert_eq!(half.frame_count(1), 1);

        let tiny = FrameRateOverride::new(Rational::new(25, 1), 1, 1000).unwrap();
        assert_eq!(tiny.frame_count(10), 1);

        let ntsc = FrameRateOverride::new(Rational::new(30000, 1001), 24000, 1001).unwrap();
        assert_eq!(ntsc.frame_count(1000), 800);
    }

    #[test]
    fn fps_override_maps_output_to_source_frames() {
        let double = FrameRateOverride::new(Rational::new(25, 1), 50, 1).unwrap();
        let frames: Vec<usize> = (0..6).map(|n| double.source_frame(n, 3)).collect();
        assert_eq!(frames, vec![0, 0, 1, 1, 2, 2]);

        let half = FrameRateOverride::new(Rational::new(25, 1), 25, 2).unwrap();
        assert_eq!(half.source_frame(1, 3), 2);
        assert_eq!(half.source_frame(5, 3), 2);
    }

    #[test]
    fn fps_override_needs_positive_rate() {
        assert!(FrameRateOverride::new(Rational::new(25, 1), 0, 1).is_none());
        assert!(FrameRateOverride::new(Rational::new(25, 1), 25, 0).is_none());
    }
}
