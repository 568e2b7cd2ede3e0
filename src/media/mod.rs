//! External media tools used before generation starts.

pub mod error;
pub mod ffmpeg;

use std::path::Path;

pub use error::{MediaError, Result};
pub use ffmpeg::FfmpegTools;

/// Image inspection and squaring, behind a trait so runs can be tested
/// without ffmpeg installed.
pub trait MediaTools: Send + Sync {
    /// Width and height in pixels.
    fn dimensions(&self, image: &Path) -> Result<(u32, u32)>;

    /// Pad `input` to a centered square image written to `output`.
    fn make_square(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Near-square images are left alone.
pub fn is_square(width: u32, height: u32, tolerance: u32) -> bool {
    width.abs_diff(height) < tolerance
}
