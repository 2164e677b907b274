//! Sentence-grouping scene extractor.

use crate::segment::SENTENCE_TERMINATORS;
use crate::SceneExtractor;
use async_trait::async_trait;
use parable_error::ParableResult;

/// Groups a story's sentences evenly into at most `max_scenes` scenes.
///
/// Stands in for an LLM-backed extractor and keeps scene order identical to
/// sentence order.
#[derive(Debug, Clone, Default)]
pub struct SentenceSceneExtractor;

#[async_trait]
impl SceneExtractor for SentenceSceneExtractor {
    async fn extract(&self, text: &str, max_scenes: usize) -> ParableResult<Vec<String>> {
        let sentences: Vec<&str> = text
            .split_inclusive(SENTENCE_TERMINATORS)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if sentences.is_empty() || max_scenes == 0 {
            return Ok(Vec::new());
        }

        let per_scene = sentences.len().div_ceil(max_scenes);
        Ok(sentences
            .chunks(per_scene)
            .map(|group| group.concat())
            .collect())
    }
}
