//! FFprobe geometry extraction.
//!
//! The first clip of every job is probed once; the resulting geometry is
//! applied to every subsequent clip and every synthesized transition frame.

use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Fallback frame rate when the stream reports zero or nothing.
///
/// Documented policy, not a silent default: containers occasionally omit
/// `avg_frame_rate` for variable-rate sources.
pub const FALLBACK_FPS: f64 = 30.0;

/// Output geometry applied uniformly across a merge job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputGeometry {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
}

impl OutputGeometry {
    /// Number of synthesized frames in one crossfade transition.
    ///
    /// The frame rate rounded to an integer yields a ~1 second transition;
    /// the floor of 1 keeps degenerate rates well-defined.
    pub fn transition_steps(&self) -> usize {
        (self.fps.round() as i64).max(1) as usize
    }

    /// Byte length of one RGB24 frame at this geometry.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Probe a downloaded clip for its intrinsic geometry.
///
/// Fails with `ProbeFailed` if the file is missing, ffprobe exits
/// non-zero, or no video stream with valid dimensions is present.
pub async fn probe_geometry(path: impl AsRef<Path>) -> MediaResult<OutputGeometry> {
    let (geometry, _) = probe_clip(path).await?;
    Ok(geometry)
}

/// Probe a clip for geometry plus an estimated frame count.
///
/// The frame count comes from `nb_frames` when the container records it,
/// falling back to duration x fps. Used for diagnostics only; the merge
/// engine counts frames as it decodes them.
pub async fn probe_clip(path: impl AsRef<Path>) -> MediaResult<(OutputGeometry, Option<u64>)> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::probe_failed(path, "file not found"));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::probe_failed(
            path,
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::probe_failed(path, "no video stream found"))?;

    let (width, height) = match (video_stream.width, video_stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(MediaError::probe_failed(path, "video stream has no dimensions")),
    };

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .or(video_stream.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .filter(|&f| f > 0.0)
        .unwrap_or(FALLBACK_FPS);

    let geometry = OutputGeometry { width, height, fps };

    let frames = video_stream
        .nb_frames
        .as_ref()
        .and_then(|n| n.parse::<u64>().ok())
        .or_else(|| {
            probe
                .format
                .duration
                .as_ref()
                .and_then(|d| d.parse::<f64>().ok())
                .map(|d| (d * fps).round() as u64)
        });

    debug!(
        path = %path.display(),
        width,
        height,
        fps,
        frames = ?frames,
        "Probed clip"
    );

    Ok((geometry, frames))
}

/// Parse a frame rate string (e.g. "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}
