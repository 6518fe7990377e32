//! Rawvideo frame reader over an FFmpeg pipe.
//!
//! Decoding stays in the FFmpeg process; this side of the pipe only frames
//! the byte stream into fixed-size RGB24 buffers at the clip's native
//! resolution. Normalization to the job geometry happens in `frame`.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// Streaming decoder for one clip.
pub struct FrameReader {
    child: Child,
    stdout: BufReader<ChildStdout>,
    width: u32,
    height: u32,
    frame_bytes: usize,
    frames_read: u64,
}

impl FrameReader {
    /// Spawn FFmpeg decoding `path` to rawvideo RGB24 on stdout.
    ///
    /// `width`/`height` must be the clip's native dimensions (from probe);
    /// they determine how the byte stream is cut into frames.
    pub async fn open(path: impl AsRef<Path>, width: u32, height: u32) -> MediaResult<Self> {
        let path = path.as_ref();

        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::ffmpeg_failed(format!("failed to spawn FFmpeg: {e}"), None))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("failed to capture FFmpeg stdout", None))?;

        debug!(path = %path.display(), width, height, "Opened frame reader");

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            width,
            height,
            frame_bytes: width as usize * height as usize * 3,
            frames_read: 0,
        })
    }

    /// Read the next frame, or `None` at end of stream.
    pub async fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
        let mut buf = vec![0u8; self.frame_bytes];

        match self.stdout.read_exact(&mut buf).await {
            Ok(_) => {
                self.frames_read += 1;
                Ok(Some(Frame::new(self.width, self.height, buf)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // read_exact reports UnexpectedEof both at a clean frame
                // boundary and for a torn frame; close() checks the decoder
                // exit status, which catches the torn case.
                Ok(None)
            }
            Err(e) => Err(MediaError::from(e)),
        }
    }

    /// Frames read so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Reap the FFmpeg child.
    pub async fn close(mut self) -> MediaResult<()> {
        let status = self.child.wait().await?;
        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                format!("decoder exited with status {status}"),
                None,
            ));
        }
        Ok(())
    }
}
