//! End-to-end idiom-to-video runs.

use futures::stream::{self, StreamExt};
use parable_audio::{AudioSynthesisPipeline, PcmTrack};
use parable_cache::ArtifactCache;
use parable_catalog::{AssetCatalog, ImageInput, MediaRecord};
use parable_core::{
    CancellationToken, ImageGenerator, MediaType, ParableConfig, SceneExtractor, SkippedMedia,
    StoryGenerator, bounded, validate_idiom,
};
use parable_error::{
    GeneratorError, GeneratorErrorKind, ParableResult, StorageError, StorageErrorKind,
};
use parable_video::{
    ComposerRegistry, CompositionReport, TransitionRegistry, VideoEncoder, VideoSynchronizer,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Per-run choices.
#[derive(Debug, Clone, Default, derive_builder::Builder)]
#[builder(default, setter(into, strip_option))]
pub struct RunOptions {
    /// Transition name; the configured default when unset
    pub transition: Option<String>,
    /// Composer name; the configured default when unset
    pub composer: Option<String>,
    /// Cancels the run between and during stages
    pub cancel: CancellationToken,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    /// Normalized idiom
    pub idiom: String,
    /// Catalog id of the story
    pub story_id: i32,
    /// Scenes saved with the story
    pub scene_count: usize,
    /// Durable image files, in scene order
    pub images: Vec<PathBuf>,
    /// Scenes whose image could not be generated or stored
    pub skipped_images: Vec<SkippedMedia>,
    /// Cataloged narration
    pub audio: MediaRecord,
    /// Cataloged video
    pub video: MediaRecord,
    /// Composition details
    pub report: CompositionReport,
}

/// Generator output ready for the catalog.
struct GeneratedImages {
    inputs: Vec<ImageInput>,
    /// Scene index of each input
    scene_indexes: Vec<usize>,
    /// Scenes the generator failed on
    skipped: Vec<SkippedMedia>,
}

/// The external generators a pipeline drives.
#[derive(Clone)]
pub struct Collaborators {
    /// Story text
    pub story: Arc<dyn StoryGenerator>,
    /// Scene prompts
    pub scenes: Arc<dyn SceneExtractor>,
    /// Scene illustrations
    pub images: Arc<dyn ImageGenerator>,
}

/// Runs every stage for an idiom, consulting the cache before each generator
/// and recording durable results in the catalog.
#[derive(Clone)]
pub struct StoryPipeline {
    config: ParableConfig,
    cache: ArtifactCache,
    catalog: Arc<dyn AssetCatalog>,
    collaborators: Collaborators,
    audio: AudioSynthesisPipeline,
    encoder: Arc<dyn VideoEncoder>,
    transitions: TransitionRegistry,
    composers: ComposerRegistry,
}

impl std::fmt::Debug for StoryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryPipeline")
            .field("story", &self.collaborators.story.name())
            .field("images", &self.collaborators.images.name())
            .field("audio", &self.audio)
            .field("transitions", &self.transitions)
            .field("composers", &self.composers)
            .finish()
    }
}

impl StoryPipeline {
    /// Assemble a pipeline.
    ///
    /// Narration uses the tiers enabled in `config.audio`; replace it with
    /// [`StoryPipeline::with_audio`].
    pub fn new(
        config: ParableConfig,
        cache: ArtifactCache,
        catalog: Arc<dyn AssetCatalog>,
        collaborators: Collaborators,
        encoder: Arc<dyn VideoEncoder>,
    ) -> Self {
        let audio = AudioSynthesisPipeline::from_config(config.audio.clone());
        let transitions = TransitionRegistry::with_defaults();
        let synchronizer = Arc::new(VideoSynchronizer::new(config.video.clone(), encoder.clone()));
        let composers = ComposerRegistry::with_defaults(synchronizer, transitions.clone());
        Self {
            config,
            cache,
            catalog,
            collaborators,
            audio,
            encoder,
            transitions,
            composers,
        }
    }

    /// Use a different narration pipeline.
    pub fn with_audio(mut self, audio: AudioSynthesisPipeline) -> Self {
        self.audio = audio;
        self
    }

    /// Registered transition strategies.
    pub fn transitions(&self) -> &TransitionRegistry {
        &self.transitions
    }

    /// Registered composers.
    pub fn composers(&self) -> &ComposerRegistry {
        &self.composers
    }

    /// The artifact cache.
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// The asset catalog.
    pub fn catalog(&self) -> &Arc<dyn AssetCatalog> {
        &self.catalog
    }

    /// Drop the cached story for `idiom` and run again.
    ///
    /// # Errors
    ///
    /// Same as [`StoryPipeline::run`].
    #[tracing::instrument(skip(self, options))]
    pub async fn regenerate(&self, idiom: &str, options: RunOptions) -> ParableResult<PipelineOutcome> {
        let idiom = validate_idiom(idiom)?;
        let key = self.cache.key("story", &idiom);
        if let Err(e) = self.cache.remove(&key).await {
            tracing::warn!(key = %key, error = %e, "Failed to drop cached story");
        }
        self.run(&idiom, options).await
    }

    /// Produce, catalog and compose the story video for `idiom`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid idiom or unknown transition/composer name, when the
    /// story generator fails, when no image can be produced, on storage
    /// errors, and when the video cannot be conformed to the narration.
    #[tracing::instrument(skip(self, options), fields(transition, composer))]
    pub async fn run(&self, idiom: &str, options: RunOptions) -> ParableResult<PipelineOutcome> {
        let idiom = validate_idiom(idiom)?;
        let transition = options
            .transition
            .unwrap_or_else(|| self.config.pipeline.default_transition.clone());
        let composer_name = options
            .composer
            .unwrap_or_else(|| self.config.pipeline.default_composer.clone());
        tracing::Span::current().record("transition", transition.as_str());
        tracing::Span::current().record("composer", composer_name.as_str());

        self.transitions.get(&transition)?;
        let composer = self.composers.get(&composer_name)?;
        let cancel = options.cancel;

        // Story
        check_cancelled(&cancel)?;
        let text = self.story_text(&idiom, &cancel).await?;

        // Scenes
        check_cancelled(&cancel)?;
        let scenes = self.scene_prompts(&text, &cancel).await?;
        let story_id = self.catalog.save_story(&idiom, &text, &scenes).await?;
        tracing::info!(story_id, scenes = scenes.len(), "Story saved");

        // Images
        check_cancelled(&cancel)?;
        let generated = self.generate_images(&scenes, &cancel).await?;
        let saved = self
            .catalog
            .save_images(story_id, &idiom, generated.inputs)
            .await?;
        let mut skipped_images = generated.skipped;
        skipped_images.extend(saved.skipped.iter().map(|s| {
            let scene = generated.scene_indexes.get(s.index).copied().unwrap_or(s.index);
            SkippedMedia::new(scene, s.reason.clone())
        }));
        skipped_images.sort_by_key(|s| s.index);
        if saved.records.is_empty() {
            return Err(GeneratorError::new(GeneratorErrorKind::Exhausted("images".into())).into());
        }
        let images = saved.paths();

        // Narration
        check_cancelled(&cancel)?;
        let audio = self.narrate(story_id, &idiom, &text, &cancel).await?;

        // Video
        check_cancelled(&cancel)?;
        let report = composer
            .compose(&images, &audio.path, &transition, &idiom)
            .await?;
        let video = self
            .catalog
            .save_video(story_id, &report.output, &idiom, Some(report.duration_secs))
            .await?;

        tracing::info!(
            story_id,
            images = images.len(),
            duration_secs = report.duration_secs,
            video = %video.path.display(),
            "Story video complete"
        );

        Ok(PipelineOutcome {
            idiom,
            story_id,
            scene_count: scenes.len(),
            images,
            skipped_images,
            audio,
            video,
            report,
        })
    }

    async fn story_text(&self, idiom: &str, cancel: &CancellationToken) -> ParableResult<String> {
        let generator = &self.collaborators.story;
        let timeout = self.config.pipeline.generator_timeout();
        let key = self.cache.key("story", idiom);
        self.cache
            .get_or_insert_with(&key, || async {
                bounded(generator.name(), timeout, cancel, generator.generate(idiom)).await
            })
            .await
    }

    async fn scene_prompts(&self, text: &str, cancel: &CancellationToken) -> ParableResult<Vec<String>> {
        let max_scenes = self.config.pipeline.max_scenes;
        let timeout = self.config.pipeline.generator_timeout();
        let extractor = &self.collaborators.scenes;
        let key = self.cache.key("scenes", format!("{}\u{0}{}", max_scenes, text));
        self.cache
            .get_or_insert_with(&key, || async {
                bounded("scenes", timeout, cancel, extractor.extract(text, max_scenes)).await
            })
            .await
    }

    /// Generate one image per scene, index-stable, skipping failures.
    async fn generate_images(
        &self,
        scenes: &[String],
        cancel: &CancellationToken,
    ) -> ParableResult<GeneratedImages> {
        let generator = &self.collaborators.images;
        let timeout = self.config.pipeline.generator_timeout();

        let results: Vec<ParableResult<Vec<u8>>> = stream::iter(scenes.iter())
            .map(|prompt| async move {
                let key = self.cache.key("images", prompt);
                if let Some(bytes) = self.cache.get(&key).await {
                    return Ok(bytes);
                }
                let bytes = bounded(generator.name(), timeout, cancel, generator.generate(prompt)).await?;
                if let Err(e) = self.cache.put(&key, &bytes).await {
                    tracing::warn!(key = %key, error = %e, "Failed to cache image");
                }
                Ok(bytes)
            })
            .buffered(self.config.pipeline.image_concurrency.max(1))
            .collect()
            .await;

        check_cancelled(cancel)?;

        let mut inputs = Vec::with_capacity(results.len());
        let mut scene_indexes = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(bytes) => {
                    inputs.push(ImageInput::for_scene(bytes, (index + 1) as i32));
                    scene_indexes.push(index);
                }
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping scene without an image");
                    skipped.push(SkippedMedia::new(index, e.to_string()));
                }
            }
        }

        if inputs.is_empty() {
            return Err(GeneratorError::new(GeneratorErrorKind::Exhausted("images".into())).into());
        }
        Ok(GeneratedImages {
            inputs,
            scene_indexes,
            skipped,
        })
    }

    /// Synthesize (or reuse) the narration, transcode it and catalog it.
    async fn narrate(
        &self,
        story_id: i32,
        idiom: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> ParableResult<MediaRecord> {
        let key = self.cache.key("audio", text);
        let cached = self
            .cache
            .get(&key)
            .await
            .and_then(|bytes| match PcmTrack::from_wav_bytes(&bytes) {
                Ok(track) => Some(track),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Ignoring unreadable cached narration");
                    None
                }
            });

        let track = match cached {
            Some(track) => track,
            None => {
                let narration = self.audio.narrate(text, cancel).await?;
                let track = narration.track;
                match track.to_wav_bytes() {
                    Ok(bytes) => {
                        if let Err(e) = self.cache.put(&key, &bytes).await {
                            tracing::warn!(key = %key, error = %e, "Failed to cache narration");
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Could not encode narration for caching"),
                }
                track
            }
        };

        let scratch = tempfile::Builder::new()
            .prefix("parable-audio-")
            .tempdir()
            .map_err(|e| StorageError::new(StorageErrorKind::DirectoryCreation(e.to_string())))?;
        let wav = scratch.path().join("narration.wav");
        track.write_wav(&wav).await?;
        let mp3 = scratch.path().join(MediaType::Audio.file_name(idiom, 1));
        self.encoder.transcode_audio(&wav, &mp3).await?;

        self.catalog
            .save_audio(story_id, &mp3, idiom, Some(track.duration_secs()))
            .await
    }
}

fn check_cancelled(cancel: &CancellationToken) -> ParableResult<()> {
    if cancel.is_cancelled() {
        Err(GeneratorError::new(GeneratorErrorKind::Cancelled).into())
    } else {
        Ok(())
    }
}
