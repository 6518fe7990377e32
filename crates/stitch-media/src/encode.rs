//! Rawvideo frame sink over an FFmpeg pipe.
//!
//! The mirror of `decode`: normalized RGB24 frames are written to FFmpeg's
//! stdin and encoded to H.264 in the FFmpeg process. Every frame must
//! match the sink geometry exactly; this is where the uniform-geometry
//! invariant is enforced at the last possible moment.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;
use crate::probe::OutputGeometry;

/// Streaming encoder for one output file.
pub struct FrameSink {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: JoinHandle<String>,
    output: PathBuf,
    geometry: OutputGeometry,
    frames_written: u64,
}

impl FrameSink {
    /// Spawn FFmpeg encoding rawvideo RGB24 from stdin to `output`.
    pub async fn create(output: impl AsRef<Path>, geometry: OutputGeometry) -> MediaResult<Self> {
        let output = output.as_ref().to_path_buf();

        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let mut child = Command::new("ffmpeg")
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s",
                &format!("{}x{}", geometry.width, geometry.height),
                "-r",
                &format!("{:.3}", geometry.fps),
                "-i",
                "-",
                "-c:v",
                "libx264",
                "-preset",
                "fast",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
                "-y",
            ])
            .arg(&output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::ffmpeg_failed(format!("failed to spawn FFmpeg: {e}"), None))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("failed to capture FFmpeg stdin", None))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("failed to capture FFmpeg stderr", None))?;

        // Drain stderr while frames are being written; a full pipe would
        // stall the encoder and deadlock write().
        let stderr_drain = tokio::spawn(async move {
            let mut stderr = stderr;
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        debug!(
            output = %output.display(),
            width = geometry.width,
            height = geometry.height,
            fps = geometry.fps,
            "Opened frame sink"
        );

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_drain,
            output,
            geometry,
            frames_written: 0,
        })
    }

    /// Append one frame to the output stream.
    pub async fn write(&mut self, frame: &Frame) -> MediaResult<()> {
        if !frame.matches(&self.geometry) {
            return Err(MediaError::FrameGeometry {
                got_width: frame.width,
                got_height: frame.height,
                want_width: self.geometry.width,
                want_height: self.geometry.height,
            });
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::ffmpeg_failed("sink already finished", None))?;

        stdin.write_all(&frame.data).await?;
        self.frames_written += 1;
        Ok(())
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Close stdin, wait for the encoder, and verify it succeeded.
    pub async fn finish(mut self) -> MediaResult<u64> {
        // Dropping stdin signals EOF to the encoder.
        drop(self.stdin.take());

        let status = self.child.wait().await?;
        let stderr = self.stderr_drain.await.unwrap_or_default();
        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                format!("encoder exited with status {status}"),
                Some(stderr),
            ));
        }

        info!(
            output = %self.output.display(),
            frames = self.frames_written,
            "Finished encoding output"
        );

        Ok(self.frames_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::probe_clip;
    use tempfile::TempDir;

    fn tools_available() -> bool {
        which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
    }

    #[tokio::test]
    async fn test_sink_encodes_written_frames() {
        if !tools_available() {
            eprintln!("skipping: ffmpeg/ffprobe not on PATH");
            return;
        }

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.mp4");
        let geometry = OutputGeometry {
            width: 64,
            height: 48,
            fps: 10.0,
        };

        let mut sink = FrameSink::create(&output, geometry).await.unwrap();
        for i in 0..30u8 {
            let frame = Frame::new(64, 48, vec![i.wrapping_mul(8); 64 * 48 * 3]);
            sink.write(&frame).await.unwrap();
        }
        let written = sink.finish().await.unwrap();
        assert_eq!(written, 30);

        let (probed, frames) = probe_clip(&output).await.unwrap();
        assert_eq!((probed.width, probed.height), (64, 48));
        assert_eq!(frames, Some(30));
    }

    #[tokio::test]
    async fn test_sink_rejects_mismatched_geometry() {
        if !tools_available() {
            eprintln!("skipping: ffmpeg/ffprobe not on PATH");
            return;
        }

        let dir = TempDir::new().unwrap();
        let geometry = OutputGeometry {
            width: 64,
            height: 48,
            fps: 10.0,
        };

        let mut sink = FrameSink::create(dir.path().join("out.mp4"), geometry)
            .await
            .unwrap();
        let wrong = Frame::new(32, 32, vec![0; 32 * 32 * 3]);
        let err = sink.write(&wrong).await.unwrap_err();
        assert!(matches!(err, MediaError::FrameGeometry { .. }));
    }
}
