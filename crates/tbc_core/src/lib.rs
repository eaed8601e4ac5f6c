//! TBC Core - frame decode and colour conversion for time-base-corrected
//! analog video captures.
//!
//! Open a capture (and optionally a separate chroma capture) with
//! [`SourceBinding`], then request frames by index. Each frame comes back as
//! normalized float planes ready for a downstream video pipeline.
//!
//! ```no_run
//! use tbc_core::config::Settings;
//! use tbc_core::{SourceBinding, SourcePaths};
//!
//! let settings = Settings::default();
//! let binding = SourceBinding::bind(&SourcePaths::single("capture.tbc"), &settings).unwrap();
//! let decoded = binding.decode_frame(0).unwrap();
//! println!("{}x{}", decoded.frame.width, decoded.frame.height);
//! ```

pub mod binding;
pub mod compositor;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod logging;
pub mod metadata;
pub mod session;
pub mod stream;
pub mod window;

#[cfg(test)]
mod test_support;

pub use binding::{ColorFamily, DecodedFrame, SourceBinding, SourcePaths, VideoInfo};
pub use compositor::OutputFrame;
pub use error::{DecodeError, DecodeResult, OpenError, OpenResult};
pub use frame::ComponentFrame;
pub use session::SourceSession;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
