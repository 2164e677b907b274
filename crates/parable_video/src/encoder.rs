//! The adapter between sync plans and the actual media toolchain.

use crate::sync::SyncPlan;
use async_trait::async_trait;
use parable_audio::{AudioDecoder, PcmTrack};
use parable_core::VideoConfig;
use parable_error::{
    AudioError, AudioErrorKind, ParableResult, StorageError, StorageErrorKind, SyncError,
    SyncErrorKind,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Renders plans to video files and inspects media durations.
///
/// This is the one place that knows about external tool versions and flags.
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    /// Playback length of a media file in seconds.
    async fn probe_duration(&self, path: &Path) -> ParableResult<f64>;

    /// Render `plan` to `output`.
    async fn render(&self, plan: &SyncPlan, output: &Path) -> ParableResult<()>;

    /// Re-encode narration at `source` as MP3 at `dest`.
    async fn transcode_audio(&self, source: &Path, dest: &Path) -> ParableResult<()>;
}

/// [`VideoEncoder`] backed by the system `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    fps: u32,
    bitrate: String,
}

impl FfmpegEncoder {
    /// Encoder using the executables and export settings in `config`.
    pub fn from_config(config: &VideoConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg.clone(),
            ffprobe: config.ffprobe.clone(),
            fps: config.fps.max(1),
            bitrate: config.bitrate.clone(),
        }
    }

    /// Command-line arguments rendering `plan` to `output`.
    ///
    /// Each clip becomes a looped still input. Clips with an overlap are
    /// joined with `xfade`, the rest with `concat`, and the output is cut at
    /// the plan's target length.
    pub fn render_args(&self, plan: &SyncPlan, output: &Path) -> Vec<String> {
        let fps = self.fps;
        let mut args: Vec<String> = vec!["-y".into(), "-hide_banner".into(), "-loglevel".into(), "error".into()];

        for clip in &plan.clips {
            args.extend([
                "-loop".into(),
                "1".into(),
                "-framerate".into(),
                fps.to_string(),
                "-t".into(),
                format!("{:.3}", clip.duration),
                "-i".into(),
                clip.source.display().to_string(),
            ]);
        }
        args.extend(["-i".into(), plan.audio.display().to_string()]);

        let mut graph: Vec<String> = plan
            .clips
            .iter()
            .enumerate()
            .map(|(i, _)| format!("[{i}:v]format=yuv420p,setsar=1,fps={fps}[v{i}]"))
            .collect();

        let mut current = "v0".to_string();
        let mut elapsed = plan.clips.first().map(|c| c.duration).unwrap_or_default();
        for (i, clip) in plan.clips.iter().enumerate().skip(1) {
            let next = format!("x{i}");
            match clip.effect.xfade_name().filter(|_| clip.overlap_in > 0.0) {
                Some(transition) => {
                    let offset = (elapsed - clip.overlap_in).max(0.0);
                    graph.push(format!(
                        "[{current}][v{i}]xfade=transition={transition}:duration={:.3}:offset={:.3}[{next}]",
                        clip.overlap_in, offset
                    ));
                }
                None => graph.push(format!("[{current}][v{i}]concat=n=2:v=1:a=0[{next}]")),
            }
            elapsed += clip.duration - clip.overlap_in;
            current = next;
        }

        args.extend([
            "-filter_complex".into(),
            graph.join(";"),
            "-map".into(),
            format!("[{current}]"),
            "-map".into(),
            format!("{}:a", plan.clips.len()),
            "-c:v".into(),
            "libx264".into(),
            "-b:v".into(),
            self.bitrate.clone(),
            "-r".into(),
            fps.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            "aac".into(),
            "-t".into(),
            format!("{:.3}", plan.target_secs),
            "-movflags".into(),
            "+faststart".into(),
            output.display().to_string(),
        ]);
        args
    }

    async fn run(&self, program: &Path, args: &[String]) -> Result<Vec<u8>, String> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("failed to run {}: {}", program.display(), e))?;

        if !output.status.success() {
            return Err(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    async fn probe_duration(&self, path: &Path) -> ParableResult<f64> {
        let args = [
            "-v".to_string(),
            "error".into(),
            "-show_entries".into(),
            "format=duration".into(),
            "-of".into(),
            "default=noprint_wrappers=1:nokey=1".into(),
            path.display().to_string(),
        ];
        let stdout = self
            .run(&self.ffprobe, &args)
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::FileRead(e)))?;

        let text = String::from_utf8_lossy(&stdout);
        text.trim()
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: no duration in ffprobe output '{}'",
                    path.display(),
                    text.trim()
                )))
                .into()
            })
    }

    #[tracing::instrument(skip(self, plan), fields(clips = plan.clips.len(), target_secs = plan.target_secs, output = %output.display()))]
    async fn render(&self, plan: &SyncPlan, output: &Path) -> ParableResult<()> {
        if plan.clips.is_empty() {
            return Err(SyncError::new(SyncErrorKind::Encode("plan has no clips".into())).into());
        }
        let args = self.render_args(plan, output);
        self.run(&self.ffmpeg, &args)
            .await
            .map_err(|e| SyncError::new(SyncErrorKind::Encode(e)))?;
        tracing::info!("Video rendered");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(source = %source.display(), dest = %dest.display()))]
    async fn transcode_audio(&self, source: &Path, dest: &Path) -> ParableResult<()> {
        let args = [
            "-y".to_string(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            source.display().to_string(),
            "-codec:a".into(),
            "libmp3lame".into(),
            "-q:a".into(),
            "2".into(),
            dest.display().to_string(),
        ];
        self.run(&self.ffmpeg, &args)
            .await
            .map_err(|e| AudioError::new(AudioErrorKind::Encode(e)))?;
        Ok(())
    }
}

#[async_trait]
impl AudioDecoder for FfmpegEncoder {
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn decode(&self, bytes: &[u8], format: &str, sample_rate: u32) -> ParableResult<PcmTrack> {
        let scratch = tempfile::Builder::new()
            .prefix("parable-decode-")
            .tempfile()
            .map_err(|e| AudioError::new(AudioErrorKind::Decode(e.to_string())))?;
        tokio::fs::write(scratch.path(), bytes)
            .await
            .map_err(|e| AudioError::new(AudioErrorKind::Decode(e.to_string())))?;

        let args = [
            "-hide_banner".to_string(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            scratch.path().display().to_string(),
            "-f".into(),
            "s16le".into(),
            "-ac".into(),
            "1".into(),
            "-ar".into(),
            sample_rate.to_string(),
            "pipe:1".into(),
        ];
        let raw = self
            .run(&self.ffmpeg, &args)
            .await
            .map_err(|e| AudioError::new(AudioErrorKind::Decode(format!("{}: {}", format, e))))?;

        let samples = raw
            .chunks_exact(2)
            .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
            .collect();
        Ok(PcmTrack::new(samples, sample_rate))
    }
}
