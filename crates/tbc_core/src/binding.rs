//! Host-facing source binding.
//!
//! A [`SourceBinding`] couples a primary (luma or composite) session with an
//! optional chroma session, reports the [`VideoInfo`] a host needs before
//! requesting frames, and turns each request into a normalized
//! [`OutputFrame`] plus its display properties.

use std::path::PathBuf;

use crate::compositor::{composite, ColorScale, OutputFrame, PlaneSource};
use crate::config::Settings;
use crate::error::{DecodeError, DecodeResult, OpenError, OpenResult};
use crate::frame::ComponentFrame;
use crate::geometry::{FrameProps, FrameRateOverride, Rational};
use crate::metadata::{MetadataLoader, SidecarLoader};
use crate::session::SourceSession;

/// Paths of the captures bound together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    /// Luma (or composite) capture.
    pub primary: PathBuf,
    /// Separate chroma capture.
    pub chroma: Option<PathBuf>,
    /// Independent Pr capture. Not supported; binding fails when set.
    pub pr: Option<PathBuf>,
}

impl SourcePaths {
    pub fn single(primary: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            chroma: None,
            pr: None,
        }
    }

    pub fn dual(primary: impl Into<PathBuf>, chroma: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            chroma: Some(chroma.into()),
            pr: None,
        }
    }
}

/// Plane layout of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFamily {
    /// Y only.
    Gray,
    /// Y, U and V at full resolution.
    Yuv,
}

/// Clip description reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInfo {
    pub color_family: ColorFamily,
    pub width: usize,
    pub height: usize,
    pub frame_count: usize,
    pub fps: Rational,
}

/// One output frame and its display properties.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub frame: OutputFrame,
    pub props: FrameProps,
}

/// Primary session, optional chroma session and output description.
#[derive(Debug)]
pub struct SourceBinding {
    primary: SourceSession,
    chroma: Option<SourceSession>,
    info: VideoInfo,
    fps_override: Option<FrameRateOverride>,
    scale: ColorScale,
    props: FrameProps,
}

impl SourceBinding {
    /// Bind sources using the sidecars next to them.
    pub fn bind(paths: &SourcePaths, settings: &Settings) -> OpenResult<Self> {
        Self::bind_with(&SidecarLoader::new(), paths, settings)
    }

    /// Bind sources with a custom metadata loader.
    pub fn bind_with(
        loader: &dyn MetadataLoader,
        paths: &SourcePaths,
        settings: &Settings,
    ) -> OpenResult<Self> {
        if let Some(pr) = &paths.pr {
            return Err(OpenError::unsupported(format!(
                "separate Pr source '{}' is not supported",
                pr.display()
            )));
        }

        let primary = SourceSession::open_with(loader, &paths.primary, settings)?;
        let chroma = match &paths.chroma {
            Some(path) => {
                let chroma = SourceSession::open_with(loader, path, settings)?;
                check_compatible(&primary, &chroma)?;
                Some(chroma)
            }
            None => None,
        };

        let native_rate = primary.frame_rate();
        let fps_override =
            FrameRateOverride::new(native_rate, settings.output.fps_num, settings.output.fps_den);
        let (fps, frame_count) = match &fps_override {
            Some(retime) => (retime.target(), retime.frame_count(primary.frame_count())),
            None => (native_rate, primary.frame_count()),
        };

        let color_family = if primary.is_mono() && chroma.is_none() {
            ColorFamily::Gray
        } else {
            ColorFamily::Yuv
        };

        let info = VideoInfo {
            color_family,
            width: primary.output_width(),
            height: primary.output_height(),
            frame_count,
            fps,
        };
        let scale = ColorScale::from_levels(primary.black_level(), primary.white_level());
        let props = FrameProps::for_parameters(primary.parameters(), fps);

        tracing::info!(
            "[TbcSource] Bound {}{} as {:?} {}x{}, {} frames at {}",
            paths.primary.display(),
            paths
                .chroma
                .as_deref()
                .map(|c| format!(" + {}", c.display()))
                .unwrap_or_default(),
            info.color_family,
            info.width,
            info.height,
            info.frame_count,
            info.fps
        );

        Ok(Self {
            primary,
            chroma,
            info,
            fps_override,
            scale,
            props,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    pub fn primary(&self) -> &SourceSession {
        &self.primary
    }

    pub fn chroma(&self) -> Option<&SourceSession> {
        self.chroma.as_ref()
    }

    /// Decode output frame `n`.
    ///
    /// The primary session decodes first, then the chroma session; the two
    /// locks are never held together.
    pub fn decode_frame(&self, n: i64) -> DecodeResult<DecodedFrame> {
        if n < 0 || n as u64 >= self.info.frame_count as u64 {
            return Err(DecodeError::out_of_range(n, self.info.frame_count));
        }
        let source_frame = match &self.fps_override {
            Some(retime) => retime.source_frame(n as usize, self.primary.frame_count()) as i64,
            None => n,
        };

        let luma_frame = self.primary.decode_frame(source_frame)?;
        let chroma_frame = match &self.chroma {
            Some(session) => Some((session, session.decode_frame(source_frame)?)),
            None => None,
        };

        let luma = plane_source(&self.primary, &luma_frame);
        let chroma = match (&chroma_frame, self.info.color_family) {
            (Some((session, frame)), _) => Some(plane_source(session, frame)),
            (None, ColorFamily::Yuv) => Some(luma),
            (None, ColorFamily::Gray) => None,
        };

        let frame = composite(&luma, chroma.as_ref(), self.primary.geometry(), &self.scale);
        Ok(DecodedFrame {
            frame,
            props: self.props,
        })
    }

    /// Close every bound session.
    pub fn close(&self) {
        self.primary.close();
        if let Some(chroma) = &self.chroma {
            chroma.close();
        }
    }
}

fn plane_source<'a>(
    session: &SourceSession,
    frame: &'a ComponentFrame,
) -> PlaneSource<'a> {
    PlaneSource {
        frame,
        first_active_line: session.first_active_frame_line(),
        active_video_start: session.active_video_start(),
    }
}

fn check_compatible(primary: &SourceSession, chroma: &SourceSession) -> OpenResult<()> {
    if primary.output_width() != chroma.output_width()
        || primary.output_height() != chroma.output_height()
    {
        return Err(OpenError::DimensionMismatch {
            primary_width: primary.output_width(),
            primary_height: primary.output_height(),
            chroma_width: chroma.output_width(),
            chroma_height: chroma.output_height(),
        });
    }
    if primary.frame_count() != chroma.frame_count() {
        return Err(OpenError::FrameCountMismatch {
            primary: primary.frame_count(),
            chroma: chroma.frame_count(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::NEUTRAL;
    use crate::engine::EngineKind;
    use crate::geometry::FieldDominance;
    use crate::test_support::{write_capture, write_flat_capture, CaptureShape};
    use std::path::Path;
    use tempfile::tempdir;

    fn open_single(path: &Path, settings: &Settings) -> OpenResult<SourceBinding> {
        SourceBinding::bind(&SourcePaths::single(path), settings)
    }

    fn mono_settings() -> Settings {
        let mut settings = Settings::default();
        settings.decode.engine = EngineKind::Mono;
        settings
    }

    #[test]
    fn bindings_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SourceBinding>();
    }

    #[test]
    fn single_colour_source_reports_yuv() {
        let dir = tempdir().unwrap();
        let tbc = write_flat_capture(dir.path(), "ntsc", &CaptureShape::ntsc(2), 30000);
        let binding = open_single(&tbc, &Settings::default()).unwrap();

        let info = binding.info();
        assert_eq!(info.color_family, ColorFamily::Yuv);
        assert_eq!((info.width, info.height), (24, 488));
        assert_eq!(info.frame_count, 2);
        assert_eq!(info.fps, Rational::new(30000, 1001));
    }

    #[test]
    fn flat_source_converts_to_mid_grey_with_neutral_padding() {
        let dir = tempdir().unwrap();
        let tbc = write_flat_capture(dir.path(), "ntsc", &CaptureShape::ntsc(2), 30000);
        let binding = open_single(&tbc, &Settings::default()).unwrap();

        let decoded = binding.decode_frame(1).unwrap();
        let frame = &decoded.frame;
        let (u, v) = (frame.u.as_ref().unwrap(), frame.v.as_ref().unwrap());
        for row in 0..frame.height {
            for x in 0..frame.width {
                let i = row * frame.width + x;
                let expected = if row < 485 && x < 20 { 0.5 } else { NEUTRAL };
                assert_eq!(frame.y[i], expected, "luma at {x},{row}");
                assert_eq!((u[i], v[i]), (NEUTRAL, NEUTRAL), "chroma at {x},{row}");
            }
        }
    }

    #[test]
    fn display_properties_follow_the_primary() {
        let dir = tempdir().unwrap();
        let tbc = write_flat_capture(dir.path(), "pal", &CaptureShape::pal(1), 30000);
        let binding = open_single(&tbc, &Settings::default()).unwrap();

        let props = binding.decode_frame(0).unwrap().props;
        assert_eq!(props.duration, Rational::new(1, 25));
        assert_eq!(props.sample_aspect_ratio, Rational::new(259, 311));
        assert_eq!(props.field_dominance, FieldDominance::TopFieldFirst);
        assert_eq!((props.color.primaries, props.color.matrix), (5, 5));
    }

    #[test]
    fn mono_without_chroma_is_gray() {
        let dir = tempdir().unwrap();
        let tbc = write_flat_capture(dir.path(), "ntsc", &CaptureShape::ntsc(1), 30000);
        let binding = open_single(&tbc, &mono_settings()).unwrap();

        assert_eq!(binding.info().color_family, ColorFamily::Gray);
        let decoded = binding.decode_frame(0).unwrap();
        assert!(decoded.frame.is_mono());
    }

    #[test]
    fn dual_source_luma_matches_single_mono() {
        let dir = tempdir().unwrap();
        let shape = CaptureShape::ntsc(2);
        let luma = write_capture(dir.path(), "luma", &shape, |pos, line, x| {
            (12000 + 500 * pos + 37 * (line % 11) + 101 * (x % 7)) as u16
        });
        let chroma = write_capture(dir.path(), "chroma", &shape, |_, line, x| {
            if (line * 32 + x) % 2 == 0 {
                30000
            } else {
                26000
            }
        });
        let settings = mono_settings();

        let single = open_single(&luma, &settings).unwrap();
        let dual = SourceBinding::bind(&SourcePaths::dual(&luma, &chroma), &settings).unwrap();
        assert_eq!(dual.info().color_family, ColorFamily::Yuv);

        for n in 0..2 {
            let a = single.decode_frame(n).unwrap().frame;
            let b = dual.decode_frame(n).unwrap().frame;
            assert_eq!(a.y, b.y, "frame {n}");
            assert!(a.u.is_none());
            assert!(b.u.is_some());
        }
    }

    #[test]
    fn chroma_planes_come_from_the_chroma_source() {
        let dir = tempdir().unwrap();
        let shape = CaptureShape::ntsc(1);
        let luma = write_flat_capture(dir.path(), "luma", &shape, 20000);
        let chroma = write_capture(dir.path(), "chroma", &shape, |_, _, x| {
            (20000 + 2000 * [0, 1, 0, -1][x % 4]) as u16
        });
        let mut settings = Settings::default();
        settings.decode.engine = EngineKind::Ntsc1D;

        let single = open_single(&luma, &settings).unwrap();
        let dual = SourceBinding::bind(&SourcePaths::dual(&luma, &chroma), &settings).unwrap();
        let plain = single.decode_frame(0).unwrap().frame;
        let out = dual.decode_frame(0).unwrap().frame;
        assert_eq!(plain.y, out.y);
        assert!(plain.u.as_ref().unwrap().iter().all(|&s| s == NEUTRAL));

        let session = dual.chroma().unwrap();
        let components = session.decode_frame(0).unwrap();
        let scale = ColorScale::from_levels(shape.black_16b_ire, shape.white_16b_ire);
        let first_line = session.first_active_frame_line();
        let start = session.active_video_start();
        let (u, v) = (out.u.as_ref().unwrap(), out.v.as_ref().unwrap());
        for row in [0, 100, 300, 484] {
            let (u_src, v_src) = (components.u(first_line + row), components.v(first_line + row));
            for x in 0..20 {
                let i = row * out.width + x;
                assert_eq!(u[i], scale.cb(u_src[start + x]), "U at {x},{row}");
                assert_eq!(v[i], scale.cr(v_src[start + x]), "V at {x},{row}");
            }
        }
        assert!(u.iter().any(|&s| s.abs() > 1e-3), "chroma source carries colour");
    }

    #[test]
    fn dimension_mismatch_fails_at_bind() {
        let dir = tempdir().unwrap();
        let luma = write_flat_capture(dir.path(), "luma", &CaptureShape::ntsc(2), 20000);
        let chroma = write_flat_capture(dir.path(), "chroma", &CaptureShape::pal(2), 20000);

        let err = SourceBinding::bind(&SourcePaths::dual(&luma, &chroma), &Settings::default())
            .unwrap_err();
        assert!(matches!(
            err,
            OpenError::DimensionMismatch {
                primary_height: 488,
                chroma_height: 576,
                ..
            }
        ));
    }

    #[test]
    fn frame_count_mismatch_fails_at_bind() {
        let dir = tempdir().unwrap();
        let luma = write_flat_capture(dir.path(), "luma", &CaptureShape::ntsc(2), 20000);
        let chroma = write_flat_capture(dir.path(), "chroma", &CaptureShape::ntsc(3), 20000);

        let err = SourceBinding::bind(&SourcePaths::dual(&luma, &chroma), &Settings::default())
            .unwrap_err();
        assert!(matches!(
            err,
            OpenError::FrameCountMismatch {
                primary: 2,
                chroma: 3
            }
        ));
    }

    #[test]
    fn pr_source_is_rejected_before_opening() {
        let mut paths = SourcePaths::dual("missing_luma.tbc", "missing_chroma.tbc");
        paths.pr = Some(PathBuf::from("missing_pr.tbc"));

        let err = SourceBinding::bind(&paths, &Settings::default()).unwrap_err();
        assert!(matches!(err, OpenError::UnsupportedConfiguration(_)));
    }

    #[test]
    fn fps_override_retimes_frames() {
        let dir = tempdir().unwrap();
        let tbc = write_capture(dir.path(), "pal", &CaptureShape::pal(3), |pos, _, _| {
            (20000 + 1000 * pos) as u16
        });
        let mut settings = mono_settings();
        settings.output.fps_num = 50;
        let binding = open_single(&tbc, &settings).unwrap();

        let info = binding.info();
        assert_eq!(info.frame_count, 6);
        assert_eq!(info.fps, Rational::new(50, 1));

        // Output frames 2 and 3 both show source frame 1 (fields 2 and 3)
        let a = binding.decode_frame(2).unwrap();
        let b = binding.decode_frame(3).unwrap();
        assert_eq!(a.frame, b.frame);
        assert_eq!(a.props.duration, Rational::new(1, 50));
        assert!(matches!(
            binding.decode_frame(6),
            Err(DecodeError::FrameOutOfRange { index: 6, frame_count: 6 })
        ));
    }

    #[test]
    fn decode_fails_after_close() {
        let dir = tempdir().unwrap();
        let tbc = write_flat_capture(dir.path(), "ntsc", &CaptureShape::ntsc(1), 20000);
        let binding = open_single(&tbc, &Settings::default()).unwrap();

        binding.close();
        assert!(matches!(binding.decode_frame(0), Err(DecodeError::NotOpen)));
    }
}
