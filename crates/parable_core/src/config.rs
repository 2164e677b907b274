//! Configuration structures for the Parable pipeline.
//!
//! Configuration is layered the same way for every entry point:
//! - Bundled defaults (include_str! from parable.toml)
//! - User overrides (~/.config/parable/parable.toml, then ./parable.toml)
//! - `PARABLE__<SECTION>__<KEY>` environment variables
//!
//! Later sources take precedence over earlier ones.

use config::{Config, Environment, File, FileFormat};
use parable_error::{ConfigError, ParableError, ParableResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Where durable artifacts, the catalog database and the cache live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(default, setter(into))]
pub struct StorageConfig {
    /// Root of the media tree (`images/`, `audio/`, `videos/`)
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// SQLite database file
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Artifact cache directory
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Maximum pooled database connections
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("storage")
}

fn default_database() -> PathBuf {
    PathBuf::from("storage/parable.db")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_pool_size() -> u32 {
    8
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            database: default_database(),
            cache_dir: default_cache_dir(),
            pool_size: default_pool_size(),
        }
    }
}

impl StorageConfig {
    /// Storage layout rooted entirely inside `dir`.
    ///
    /// Used by tests and by callers that want a self-contained workspace.
    pub fn under(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            root: dir.join("storage"),
            database: dir.join("parable.db"),
            cache_dir: dir.join("cache"),
            pool_size: default_pool_size(),
        }
    }
}

/// Artifact cache switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// When false every lookup misses and nothing is written
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Narration synthesis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(default, setter(into))]
pub struct AudioConfig {
    /// Sample rate every segment is normalized to before merging
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Synthetic fallback duration per character
    #[serde(default = "default_seconds_per_char")]
    pub seconds_per_char: f64,
    /// Upper bound on segment length in characters
    #[serde(default = "default_max_segment_chars")]
    pub max_segment_chars: usize,
    /// Segments synthesized at once
    #[serde(default = "default_max_concurrent_segments")]
    pub max_concurrent_segments: usize,
    /// Deadline for one tier attempt on one segment
    #[serde(default = "default_tier_timeout_secs")]
    pub tier_timeout_secs: u64,
    /// Networked TTS endpoint (tier 1); tier skipped when unset
    #[serde(default)]
    pub tts_endpoint: Option<String>,
    /// Local TTS command line (tier 2); tier skipped when unset
    #[serde(default)]
    pub local_engine: Option<Vec<String>>,
}

fn default_sample_rate() -> u32 {
    22_050
}

fn default_seconds_per_char() -> f64 {
    0.3
}

fn default_max_segment_chars() -> usize {
    100
}

fn default_max_concurrent_segments() -> usize {
    4
}

fn default_tier_timeout_secs() -> u64 {
    30
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            seconds_per_char: default_seconds_per_char(),
            max_segment_chars: default_max_segment_chars(),
            max_concurrent_segments: default_max_concurrent_segments(),
            tier_timeout_secs: default_tier_timeout_secs(),
            tts_endpoint: None,
            local_engine: None,
        }
    }
}

impl AudioConfig {
    /// Tier attempt deadline as a [`Duration`].
    pub fn tier_timeout(&self) -> Duration {
        Duration::from_secs(self.tier_timeout_secs)
    }
}

/// Video assembly settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(default, setter(into))]
pub struct VideoConfig {
    /// Output frame width in pixels
    #[serde(default = "default_width")]
    pub width: u32,
    /// Output frame height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
    /// Export frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Export video bitrate, ffmpeg syntax (e.g. "5000k")
    #[serde(default = "default_bitrate")]
    pub bitrate: String,
    /// Requested overlap between adjacent clips for overlapping transitions
    #[serde(default = "default_transition_secs")]
    pub transition_secs: f64,
    /// Audio duration assumed when the track cannot be probed
    #[serde(default = "default_fallback_audio_secs")]
    pub fallback_audio_secs: f64,
    /// ffmpeg executable
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
    /// ffprobe executable
    #[serde(default = "default_ffprobe")]
    pub ffprobe: PathBuf,
    /// Directory composed videos are written to before cataloging
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_width() -> u32 {
    1080
}

fn default_height() -> u32 {
    1920
}

fn default_fps() -> u32 {
    24
}

fn default_bitrate() -> String {
    "5000k".to_string()
}

fn default_transition_secs() -> f64 {
    0.5
}

fn default_fallback_audio_secs() -> f64 {
    15.0
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            bitrate: default_bitrate(),
            transition_secs: default_transition_secs(),
            fallback_audio_secs: default_fallback_audio_secs(),
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            output_dir: default_output_dir(),
        }
    }
}

impl VideoConfig {
    /// Duration of one frame at the export frame rate.
    pub fn frame_secs(&self) -> f64 {
        1.0 / f64::from(self.fps.max(1))
    }
}

/// End-to-end pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on extracted scenes (and therefore images)
    #[serde(default = "default_max_scenes")]
    pub max_scenes: usize,
    /// Images generated at once
    #[serde(default = "default_image_concurrency")]
    pub image_concurrency: usize,
    /// Deadline for one story or image generator call
    #[serde(default = "default_generator_timeout_secs")]
    pub generator_timeout_secs: u64,
    /// Transition used when a request does not name one
    #[serde(default = "default_transition")]
    pub default_transition: String,
    /// Composer used when a request does not name one
    #[serde(default = "default_composer")]
    pub default_composer: String,
}

fn default_max_scenes() -> usize {
    15
}

fn default_image_concurrency() -> usize {
    2
}

fn default_generator_timeout_secs() -> u64 {
    120
}

fn default_transition() -> String {
    "fade".to_string()
}

fn default_composer() -> String {
    "enhanced".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_scenes: default_max_scenes(),
            image_concurrency: default_image_concurrency(),
            generator_timeout_secs: default_generator_timeout_secs(),
            default_transition: default_transition(),
            default_composer: default_composer(),
        }
    }
}

impl PipelineConfig {
    /// Generator call deadline as a [`Duration`].
    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator_timeout_secs)
    }
}

/// Endpoints of the external story and image generators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeneratorConfig {
    /// OpenAI-compatible chat completions endpoint
    #[serde(default)]
    pub story_endpoint: Option<String>,
    /// Chat model name
    #[serde(default)]
    pub story_model: Option<String>,
    /// Environment variable holding the story API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Requested story length in characters
    #[serde(default)]
    pub max_story_chars: Option<usize>,
    /// Image generation endpoint
    #[serde(default)]
    pub image_endpoint: Option<String>,
}

/// Top-level Parable configuration.
///
/// # Example
///
/// ```no_run
/// use parable_core::ParableConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ParableConfig::load()?;
/// println!("Catalog database: {}", config.storage.database.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParableConfig {
    /// Storage locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// Artifact cache switches
    #[serde(default)]
    pub cache: CacheSettings,
    /// Narration settings
    #[serde(default)]
    pub audio: AudioConfig,
    /// Video settings
    #[serde(default)]
    pub video: VideoConfig,
    /// Pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// External generator endpoints
    #[serde(default)]
    pub generators: GeneratorConfig,
}

impl ParableConfig {
    /// Load configuration from a specific file path, without other layers.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> ParableResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ParableError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ParableError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration with precedence: env > current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> ParableResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../parable.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/parable/parable.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("parable").required(false))
            .add_source(
                Environment::with_prefix("PARABLE")
                    .prefix_separator("__")
                    .separator("__"),
            );

        builder
            .build()
            .map_err(|e| {
                ParableError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ParableError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }
}
