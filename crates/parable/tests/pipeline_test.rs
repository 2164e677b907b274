//! End-to-end pipeline tests with in-process generators and encoder.

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use parable::{
    ArtifactCache, ArtifactCacheConfig, AssetCatalog, AudioConfig, AudioSynthesisPipeline,
    CancellationToken, ChatCompletionResponse, ChatStoryGenerator, Collaborators,
    GeneratorConfig, GeneratorError, GeneratorErrorKind, ImageGenerator, InputErrorKind,
    ParableConfig, ParableErrorKind, ParableResult, PcmTrack, ReconcileAction, RunOptions,
    RunOptionsBuilder, SentenceSceneExtractor, SqliteAssetCatalog, StorageConfig,
    StoryGenerator, StoryPipeline, SyncPlan, VideoEncoder,
};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const STORY: &str = "农夫在田里干活。一只兔子撞死在树桩上。农夫从此守在树下等兔子。";

/// Story generator that counts its calls.
struct CountingStory {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingStory {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoryGenerator for CountingStory {
    async fn generate(&self, _idiom: &str) -> ParableResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GeneratorError::failed("counting-story", "model offline").into());
        }
        Ok(STORY.to_string())
    }

    fn name(&self) -> &str {
        "counting-story"
    }
}

/// Image generator producing small PNGs, failing on prompts containing `fail_on`.
struct PngImages {
    fail_on: &'static str,
}

#[async_trait]
impl ImageGenerator for PngImages {
    async fn generate(&self, prompt: &str) -> ParableResult<Vec<u8>> {
        if prompt.contains(self.fail_on) {
            return Err(GeneratorError::failed("png-images", "content filtered").into());
        }
        let img = RgbImage::from_pixel(16, 12, Rgb([200, 120, 40]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        Ok(bytes.into_inner())
    }

    fn name(&self) -> &str {
        "png-images"
    }
}

/// Encoder that keeps narration as WAV and writes a placeholder video.
struct WavEncoder;

#[async_trait]
impl VideoEncoder for WavEncoder {
    async fn probe_duration(&self, path: &Path) -> ParableResult<f64> {
        let bytes = tokio::fs::read(path).await.unwrap();
        Ok(PcmTrack::from_wav_bytes(&bytes)?.duration_secs())
    }

    async fn render(&self, plan: &SyncPlan, output: &Path) -> ParableResult<()> {
        assert!(!plan.clips.is_empty());
        tokio::fs::write(output, b"mp4").await.unwrap();
        Ok(())
    }

    async fn transcode_audio(&self, source: &Path, dest: &Path) -> ParableResult<()> {
        tokio::fs::copy(source, dest).await.unwrap();
        Ok(())
    }
}

fn test_config(tmp: &TempDir) -> ParableConfig {
    let mut config = ParableConfig {
        storage: StorageConfig::under(tmp.path()),
        ..ParableConfig::default()
    };
    config.video.width = 64;
    config.video.height = 48;
    config.video.output_dir = tmp.path().join("output");
    config.pipeline.generator_timeout_secs = 10;
    config
}

async fn pipeline_with(
    tmp: &TempDir,
    story: Arc<CountingStory>,
    fail_on: &'static str,
) -> (StoryPipeline, Arc<SqliteAssetCatalog>) {
    let config = test_config(tmp);
    let cache = ArtifactCache::open(ArtifactCacheConfig::from_config(&config))
        .await
        .unwrap();
    let catalog = Arc::new(SqliteAssetCatalog::open(&config.storage).await.unwrap());
    let collaborators = Collaborators {
        story,
        scenes: Arc::new(SentenceSceneExtractor),
        images: Arc::new(PngImages { fail_on }),
    };
    let pipeline = StoryPipeline::new(
        config,
        cache,
        catalog.clone(),
        collaborators,
        Arc::new(WavEncoder),
    )
    .with_audio(AudioSynthesisPipeline::new(AudioConfig::default()));
    (pipeline, catalog)
}

#[tokio::test]
async fn test_run_produces_cataloged_video() {
    let tmp = TempDir::new().unwrap();
    let story = CountingStory::new();
    let (pipeline, catalog) = pipeline_with(&tmp, story.clone(), "never").await;

    let outcome = pipeline
        .run("守株待兔", RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.idiom, "守株待兔");
    assert_eq!(outcome.scene_count, 3);
    assert_eq!(outcome.images.len(), 3);
    assert!(outcome.skipped_images.is_empty());
    assert!(outcome.audio.path.exists());
    assert!(outcome.video.path.exists());
    assert_eq!(outcome.report.images_used, 3);
    assert_eq!(outcome.report.transition, "fade");
    assert_eq!(outcome.report.action, ReconcileAction::AsIs);

    let narration = outcome.audio.duration_secs.unwrap();
    assert!((outcome.report.duration_secs - narration).abs() < 1.0);

    let record = catalog.get_story("守株待兔").await.unwrap().unwrap();
    assert_eq!(record.text, STORY);
    assert_eq!(record.scenes.len(), 3);
    assert_eq!(record.images.len(), 3);
    assert!(record.audio.is_some());
    assert!(record.video.is_some());

    // Second run reuses the cached story
    pipeline
        .run("守株待兔", RunOptions::default())
        .await
        .unwrap();
    assert_eq!(story.calls(), 1);
}

#[tokio::test]
async fn test_failed_image_skips_its_scene() {
    let tmp = TempDir::new().unwrap();
    let (pipeline, _catalog) = pipeline_with(&tmp, CountingStory::new(), "兔子撞死").await;

    let outcome = pipeline
        .run("守株待兔", RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.images.len(), 2);
    assert_eq!(outcome.skipped_images.len(), 1);
    assert_eq!(outcome.skipped_images[0].index, 1);
    assert_eq!(outcome.report.images_used, 2);
}

#[tokio::test]
async fn test_no_image_at_all_fails_run() {
    let tmp = TempDir::new().unwrap();
    // Every scene ends with a full stop
    let (pipeline, _catalog) = pipeline_with(&tmp, CountingStory::new(), "。").await;

    let err = pipeline
        .run("守株待兔", RunOptions::default())
        .await
        .unwrap_err();
    match err.kind() {
        ParableErrorKind::Generator(e) => {
            assert_eq!(e.kind, GeneratorErrorKind::Exhausted("images".into()))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_story_failure_stops_run() {
    let tmp = TempDir::new().unwrap();
    let story = CountingStory::failing();
    let (pipeline, catalog) = pipeline_with(&tmp, story.clone(), "never").await;

    let err = pipeline
        .run("守株待兔", RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ParableErrorKind::Generator(_)));
    assert_eq!(story.calls(), 1);
    assert!(catalog.get_story("守株待兔").await.unwrap().is_none());
}

#[tokio::test]
async fn test_regenerate_bypasses_cached_story() {
    let tmp = TempDir::new().unwrap();
    let story = CountingStory::new();
    let (pipeline, _catalog) = pipeline_with(&tmp, story.clone(), "never").await;

    pipeline
        .run("守株待兔", RunOptions::default())
        .await
        .unwrap();
    pipeline
        .regenerate("守株待兔", RunOptions::default())
        .await
        .unwrap();
    assert_eq!(story.calls(), 2);
}

#[tokio::test]
async fn test_unknown_names_fail_before_generation() {
    let tmp = TempDir::new().unwrap();
    let story = CountingStory::new();
    let (pipeline, _catalog) = pipeline_with(&tmp, story.clone(), "never").await;

    let options = RunOptionsBuilder::default()
        .transition("spin")
        .build()
        .unwrap();
    let err = pipeline.run("守株待兔", options).await.unwrap_err();
    match err.kind() {
        ParableErrorKind::Input(e) => {
            assert_eq!(e.kind, InputErrorKind::UnknownTransition("spin".into()))
        }
        other => panic!("unexpected error: {other}"),
    }

    let options = RunOptionsBuilder::default()
        .composer("fancy")
        .build()
        .unwrap();
    assert!(pipeline.run("守株待兔", options).await.is_err());
    assert_eq!(story.calls(), 0);
}

#[tokio::test]
async fn test_simple_composer_with_cut() {
    let tmp = TempDir::new().unwrap();
    let (pipeline, _catalog) = pipeline_with(&tmp, CountingStory::new(), "never").await;

    let options = RunOptionsBuilder::default()
        .composer("simple")
        .build()
        .unwrap();
    let outcome = pipeline.run("守株待兔", options).await.unwrap();
    assert_eq!(outcome.report.transition, "none");
}

#[tokio::test]
async fn test_cancelled_run_does_no_work() {
    let tmp = TempDir::new().unwrap();
    let story = CountingStory::new();
    let (pipeline, _catalog) = pipeline_with(&tmp, story.clone(), "never").await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let options = RunOptionsBuilder::default().cancel(cancel).build().unwrap();
    let err = pipeline.run("守株待兔", options).await.unwrap_err();
    match err.kind() {
        ParableErrorKind::Generator(e) => assert_eq!(e.kind, GeneratorErrorKind::Cancelled),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(story.calls(), 0);
}

#[tokio::test]
async fn test_invalid_idiom_rejected() {
    let tmp = TempDir::new().unwrap();
    let (pipeline, _catalog) = pipeline_with(&tmp, CountingStory::new(), "never").await;

    let err = pipeline
        .run("   ", RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ParableErrorKind::Input(_)));
}

#[test]
fn test_chat_response_text() {
    let json = r#"{"choices":[{"message":{"role":"assistant","content":"  从前有个农夫。 "}}]}"#;
    let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
    assert_eq!(response.into_text("chat-story").unwrap(), "从前有个农夫。");

    let empty: ChatCompletionResponse =
        serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
    assert!(empty.into_text("chat-story").is_err());
}

#[test]
fn test_story_prompt_names_idiom() {
    let generator = ChatStoryGenerator::new("http://localhost:1/v1/chat/completions", "m")
        .with_max_chars(300);
    let prompt = generator.prompt("守株待兔");
    assert!(prompt.contains("守株待兔"));
    assert!(prompt.contains("300"));
}

#[test]
fn test_story_generator_requires_endpoint() {
    let err = ChatStoryGenerator::from_config(&GeneratorConfig::default()).unwrap_err();
    match err.kind() {
        ParableErrorKind::Config(e) => {
            assert_eq!(e.key.as_deref(), Some("generators.story_endpoint"));
            assert_eq!(
                e.env_var().as_deref(),
                Some("PARABLE__GENERATORS__STORY_ENDPOINT")
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}
