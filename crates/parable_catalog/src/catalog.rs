//! The asset catalog contract.

use crate::{ImageInput, MediaRecord, SavedImages, StorageStats, StoryRecord, StorySummary};
use async_trait::async_trait;
use parable_error::ParableResult;
use std::path::Path;

/// Authoritative record of stories, their scenes and their media files.
///
/// Writes for the same idiom are serialized; everything else may run
/// concurrently. Media rows are only inserted for files that are already on
/// disk with the recorded size.
#[async_trait]
pub trait AssetCatalog: Send + Sync {
    /// Upsert a story and replace its scenes in one transaction.
    ///
    /// Returns the story id. On failure the story keeps its previous state.
    async fn save_story(&self, idiom: &str, text: &str, scenes: &[String]) -> ParableResult<i32>;

    /// Store an image set for a story, replacing the previous set.
    ///
    /// Images that cannot be decoded or written are skipped and reported in
    /// [`SavedImages::skipped`]. When no image could be stored the previous
    /// set is left untouched.
    async fn save_images(
        &self,
        story_id: i32,
        idiom: &str,
        images: Vec<ImageInput>,
    ) -> ParableResult<SavedImages>;

    /// Copy a narration track into storage and make it the story's current audio.
    async fn save_audio(
        &self,
        story_id: i32,
        source: &Path,
        idiom: &str,
        duration_secs: Option<f64>,
    ) -> ParableResult<MediaRecord>;

    /// Copy a composed video into storage and make it the story's current video.
    async fn save_video(
        &self,
        story_id: i32,
        source: &Path,
        idiom: &str,
        duration_secs: Option<f64>,
    ) -> ParableResult<MediaRecord>;

    /// Load a story with scenes and media, or `None` for an unknown idiom.
    async fn get_story(&self, idiom: &str) -> ParableResult<Option<StoryRecord>>;

    /// Most recently updated stories first.
    async fn list_stories(&self, limit: usize) -> ParableResult<Vec<StorySummary>>;

    /// Delete a story, its rows and its files. Returns false for an unknown idiom.
    async fn delete_story(&self, idiom: &str) -> ParableResult<bool>;

    /// Aggregate counts and sizes.
    async fn storage_stats(&self) -> ParableResult<StorageStats>;
}
