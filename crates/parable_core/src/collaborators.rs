//! Contracts of the external generators the pipeline drives.
//!
//! Generation quality is out of scope; these traits only fix the shape of
//! each call so the cache, catalog and fallback logic can be tested with
//! in-process fakes.

use async_trait::async_trait;
use parable_error::ParableResult;

/// Produces story text for an idiom (an LLM in production).
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    /// Generate a story for `idiom`.
    async fn generate(&self, idiom: &str) -> ParableResult<String>;

    /// Short name used in logs and cache stage names.
    fn name(&self) -> &str;
}

/// Splits a story into ordered scene prompts.
#[async_trait]
pub trait SceneExtractor: Send + Sync {
    /// Extract at most `max_scenes` scenes from `text`, in story order.
    async fn extract(&self, text: &str, max_scenes: usize) -> ParableResult<Vec<String>>;
}

/// Produces one encoded image (PNG, JPEG, ...) for a scene prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image for `prompt`.
    async fn generate(&self, prompt: &str) -> ParableResult<Vec<u8>>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Splits narration text into bounded segments, the unit of speech synthesis.
pub trait TextSegmenter: Send + Sync {
    /// Segment `text` in reading order.
    fn segment(&self, text: &str) -> Vec<Segment>;
}

/// A bounded chunk of narration text.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct Segment {
    index: usize,
    text: String,
}

impl Segment {
    /// Create a segment at position `index` of its narration.
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Number of characters (not bytes) in the segment.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}
