//! End-to-end assembly of one story video.

use crate::encoder::VideoEncoder;
use crate::frames::FramePreparer;
use crate::sync::{ReconcileAction, reconcile};
use crate::timeline::uniform_clips;
use crate::transition::TransitionStrategy;
use parable_core::{MediaType, SkippedMedia, VideoConfig, validate_idiom};
use parable_error::{
    InputError, InputErrorKind, ParableResult, StorageError, StorageErrorKind, SyncError,
    SyncErrorKind,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a composition produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionReport {
    /// Rendered video file
    pub output: PathBuf,
    /// Exported length in seconds
    pub duration_secs: f64,
    /// Narration length the video was conformed to
    pub audio_secs: f64,
    /// Images that made it into the video
    pub images_used: usize,
    /// Seconds each image is held before transitions
    pub per_image_secs: f64,
    /// Images dropped because they could not be decoded
    pub skipped: Vec<SkippedMedia>,
    /// Transition strategy applied
    pub transition: String,
    /// Reconciliation branch taken
    pub action: ReconcileAction,
}

/// Turns an image sequence and a narration track into a timed video.
///
/// Each surviving image is held for `audio / images` seconds, the chosen
/// transition strategy rewrites the clip list, and the result is conformed to
/// the narration length before rendering.
#[derive(Clone)]
pub struct VideoSynchronizer {
    config: VideoConfig,
    preparer: FramePreparer,
    encoder: Arc<dyn VideoEncoder>,
}

impl std::fmt::Debug for VideoSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSynchronizer")
            .field("config", &self.config)
            .field("preparer", &self.preparer)
            .finish()
    }
}

impl VideoSynchronizer {
    /// Synchronizer exporting through `encoder`.
    pub fn new(config: VideoConfig, encoder: Arc<dyn VideoEncoder>) -> Self {
        let preparer = FramePreparer::new(config.width, config.height);
        Self {
            config,
            preparer,
            encoder,
        }
    }

    /// Export settings.
    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    /// The encoder used for probing and rendering.
    pub fn encoder(&self) -> &Arc<dyn VideoEncoder> {
        &self.encoder
    }

    /// Where the video for `idiom` is written.
    pub fn output_path(&self, idiom: &str) -> PathBuf {
        self.config
            .output_dir
            .join(MediaType::Video.file_name(idiom, 1))
    }

    /// Narration length, or the configured fallback when it cannot be probed.
    pub async fn audio_duration(&self, audio: &Path) -> f64 {
        match self.encoder.probe_duration(audio).await {
            Ok(secs) => secs,
            Err(e) => {
                tracing::warn!(
                    audio = %audio.display(),
                    error = %e,
                    fallback_secs = self.config.fallback_audio_secs,
                    "Could not read audio duration, using fallback"
                );
                self.config.fallback_audio_secs
            }
        }
    }

    /// Compose `images` over `audio` with `strategy` and render `{idiom}_story.mp4`.
    ///
    /// # Errors
    ///
    /// - [`InputErrorKind::NoImages`] when `images` is empty
    /// - [`SyncErrorKind::InsufficientInput`] when no image can be decoded
    /// - [`SyncErrorKind::ToleranceViolation`] when the track cannot be conformed
    /// - Encoder errors from rendering
    #[tracing::instrument(skip(self, images, audio, strategy), fields(images = images.len(), transition = strategy.name()))]
    pub async fn synchronize(
        &self,
        images: &[PathBuf],
        audio: &Path,
        strategy: &dyn TransitionStrategy,
        idiom: &str,
    ) -> ParableResult<CompositionReport> {
        let idiom = validate_idiom(idiom)?;
        if images.is_empty() {
            return Err(InputError::new(InputErrorKind::NoImages).into());
        }

        let frames = self.preparer.prepare(images).await?;
        if frames.is_empty() {
            return Err(SyncError::new(SyncErrorKind::InsufficientInput(images.len())).into());
        }

        let audio_secs = self.audio_duration(audio).await;
        let count = frames.frames().len();
        let per_image_secs = audio_secs / count as f64;
        let overlap = self.config.transition_secs.max(0.0).min(0.5 * per_image_secs);

        let clips = strategy.apply(uniform_clips(frames.frames(), per_image_secs), overlap);
        let plan = reconcile(clips, audio.to_path_buf(), audio_secs, self.config.frame_secs())?;

        let output = self.output_path(&idiom);
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }
        self.encoder.render(&plan, &output).await?;

        tracing::info!(
            output = %output.display(),
            duration_secs = plan.target_secs,
            images_used = count,
            skipped = frames.skipped().len(),
            action = %plan.action,
            "Story video composed"
        );

        Ok(CompositionReport {
            output,
            duration_secs: plan.target_secs,
            audio_secs,
            images_used: count,
            per_image_secs,
            skipped: frames.skipped().to_vec(),
            transition: strategy.name().to_string(),
            action: plan.action,
        })
    }
}
