//! Merge engine: download, decode, blend, encode.
//!
//! One call assembles a full job: clips are fetched into a per-job temp
//! directory, decoded frame by frame, normalized to the first clip's
//! geometry, and joined with crossfade transitions into a single output
//! file. The temp directory guard removes every downloaded clip on all
//! exit paths.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::decode::FrameReader;
use crate::encode::FrameSink;
use crate::error::{MediaError, MediaResult};
use crate::fetch::Fetcher;
use crate::frame::{crossfade, normalize, Frame};
use crate::probe::{probe_clip, probe_geometry, OutputGeometry};

/// What a completed merge produced.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Path of the assembled output file.
    pub output: PathBuf,
    /// Clips that made it into the output.
    pub clips_merged: usize,
    /// Clips dropped because their download failed.
    pub clips_skipped: u32,
    /// Total frames written, transitions included.
    pub frames_written: u64,
}

/// Download `urls` and assemble them into one video at `output_path`.
///
/// Per-clip scratch files live in a fresh temp directory under `work_dir`.
/// The first clip is mandatory: it is the sole geometry source, so its
/// fetch or probe failure fails the job. Every later clip is best-effort;
/// a failed download is logged, counted, and excluded, and the merge
/// proceeds with what survived.
pub async fn merge_clips(
    job_id: &str,
    urls: &[String],
    fetcher: &Fetcher,
    work_dir: &Path,
    output_path: &Path,
) -> MediaResult<MergeOutcome> {
    if urls.is_empty() {
        return Err(MediaError::EmptyQueue);
    }

    // Guard removes every downloaded clip on drop, success or failure.
    let workspace = tempfile::Builder::new()
        .prefix(&format!("job-{job_id}-"))
        .tempdir_in(work_dir)?;

    let first_clip = workspace.path().join("clip_000.mp4");
    fetcher
        .fetch(&urls[0], &first_clip)
        .await
        .map_err(|e| MediaError::merge_failed("failed to download first clip", e))?;

    let geometry = probe_geometry(&first_clip)
        .await
        .map_err(|e| MediaError::merge_failed("failed to probe first clip", e))?;

    info!(
        job_id = %job_id,
        width = geometry.width,
        height = geometry.height,
        fps = geometry.fps,
        clips = urls.len(),
        "Starting merge"
    );

    let mut clips = vec![first_clip];
    let mut skipped: u32 = 0;

    for (index, url) in urls.iter().enumerate().skip(1) {
        let dest = workspace.path().join(format!("clip_{index:03}.mp4"));
        match fetcher.fetch(url, &dest).await {
            Ok(()) => clips.push(dest),
            Err(e) => {
                warn!(job_id = %job_id, url = %url, error = %e, "Skipping clip");
                skipped += 1;
            }
        }
    }

    // Unreachable while the first clip is mandatory; kept so a policy
    // change upstream cannot silently produce an empty output.
    if clips.is_empty() {
        return Err(MediaError::NoDownloadableClips);
    }

    let frames_written = match assemble(job_id, &clips, geometry, output_path).await {
        Ok(frames) => frames,
        Err(e) => {
            if output_path.exists() {
                if let Err(rm) = fs::remove_file(output_path).await {
                    warn!(
                        job_id = %job_id,
                        output = %output_path.display(),
                        error = %rm,
                        "Failed to remove partial output"
                    );
                }
            }
            return Err(MediaError::merge_failed("clip assembly failed", e));
        }
    };

    info!(
        job_id = %job_id,
        output = %output_path.display(),
        clips_merged = clips.len(),
        clips_skipped = skipped,
        frames = frames_written,
        "Merge complete"
    );

    Ok(MergeOutcome {
        output: output_path.to_path_buf(),
        clips_merged: clips.len(),
        clips_skipped: skipped,
        frames_written,
    })
}

/// Decode every surviving clip in order and write the blended stream.
async fn assemble(
    job_id: &str,
    clips: &[PathBuf],
    geometry: OutputGeometry,
    output_path: &Path,
) -> MediaResult<u64> {
    let steps = geometry.transition_steps();
    let mut sink = FrameSink::create(output_path, geometry).await?;

    // Last normalized frame of the previous clip; the crossfade anchor.
    let mut prev_last: Option<Frame> = None;

    for clip in clips {
        let (native, _) = probe_clip(clip).await?;
        let mut reader = FrameReader::open(clip, native.width, native.height).await?;

        if let Some(frame) = reader.next_frame().await? {
            let first = normalize(frame, &geometry);
            match prev_last.take() {
                Some(prev) => {
                    // The final blended frame equals `first`, so the clip's
                    // own first frame is never written a second time.
                    for blended in crossfade(prev, first.clone(), steps) {
                        sink.write(&blended).await?;
                    }
                }
                None => sink.write(&first).await?,
            }
            prev_last = Some(first);
        }

        while let Some(frame) = reader.next_frame().await? {
            let frame = normalize(frame, &geometry);
            sink.write(&frame).await?;
            prev_last = Some(frame);
        }

        let decoded = reader.frames_read();
        reader.close().await?;
        debug!(job_id = %job_id, clip = %clip.display(), frames = decoded, "Decoded clip");
    }

    sink.finish().await
}
