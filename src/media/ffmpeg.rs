use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Output};

use super::error::{MediaError, Result};
use super::MediaTools;

/// Pads to max(w, h) on both axes, centered, on a white background.
const SQUARE_FILTER: &str = r"pad=max(iw\,ih):max(iw\,ih):(ow-iw)/2:(oh-ih)/2:color=white";

/// Lines of tool stderr kept in failure reasons.
const STDERR_TAIL_LINES: usize = 5;

/// [`MediaTools`] backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegTools {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl FfmpegTools {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Produces: `["-i", input, "-vf", <pad filter>, "-y", output]`
    pub fn square_args(input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-i".into(),
            input.as_os_str().to_owned(),
            "-vf".into(),
            SQUARE_FILTER.into(),
            "-y".into(),
            output.as_os_str().to_owned(),
        ]
    }

    /// Produces the ffprobe call that prints `WIDTHxHEIGHT` for the first
    /// video stream.
    pub fn probe_args(image: &Path) -> Vec<OsString> {
        vec![
            "-v".into(),
            "error".into(),
            "-select_streams".into(),
            "v:0".into(),
            "-show_entries".into(),
            "stream=width,height".into(),
            "-of".into(),
            "csv=s=x:p=0".into(),
            image.as_os_str().to_owned(),
        ]
    }

    fn run(tool: &str, args: &[OsString]) -> Result<Output> {
        let output = Command::new(tool)
            .args(args)
            .output()
            .map_err(|source| MediaError::NotInstalled {
                tool: tool.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut reason = stderr_tail(&stderr);
            if reason.is_empty() {
                reason = format!("exited with {}", output.status);
            }
            return Err(MediaError::ToolFailed {
                tool: tool.to_string(),
                reason,
            });
        }
        Ok(output)
    }
}

impl MediaTools for FfmpegTools {
    fn dimensions(&self, image: &Path) -> Result<(u32, u32)> {
        let output = Self::run(&self.ffprobe, &Self::probe_args(image))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_dimensions(&stdout)
            .ok_or_else(|| MediaError::UnreadableDimensions(stdout.trim().to_string()))
    }

    fn make_square(&self, input: &Path, output: &Path) -> Result<()> {
        tracing::info!("squaring {} -> {}", input.display(), output.display());
        Self::run(&self.ffmpeg, &Self::square_args(input, output))?;
        Ok(())
    }
}

/// Parse ffprobe's `WIDTHxHEIGHT` output. Only the first line is used.
fn parse_dimensions(output: &str) -> Option<(u32, u32)> {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (w, h) = line.split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
