//! Catalog records returned to callers.

use crate::models::{AudioRow, ImageRow, SceneRow, StoryRow, VideoRow};
use chrono::NaiveDateTime;
use parable_core::{MediaType, SkippedMedia};
use serde::Serialize;
use std::path::PathBuf;

/// Characters of story text shown in a summary preview.
pub const PREVIEW_CHARS: usize = 100;

/// An image to add to the catalog.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Encoded image bytes in any format the `image` crate decodes
    pub bytes: Vec<u8>,
    /// 1-based order of the scene this image illustrates
    pub scene_order: Option<i32>,
}

impl ImageInput {
    /// Image not linked to a scene.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            scene_order: None,
        }
    }

    /// Image illustrating scene `order` (1-based).
    pub fn for_scene(bytes: Vec<u8>, order: i32) -> Self {
        Self {
            bytes,
            scene_order: Some(order),
        }
    }
}

/// One scene of a story.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneRecord {
    pub id: i32,
    /// 1-based position in the story
    pub order: i32,
    pub text: String,
}

impl From<SceneRow> for SceneRecord {
    fn from(row: SceneRow) -> Self {
        Self {
            id: row.id,
            order: row.scene_order,
            text: row.scene_text,
        }
    }
}

/// A durable media file tracked by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRecord {
    pub id: i32,
    pub story_id: i32,
    pub media_type: MediaType,
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    /// Playback length, for audio and video
    pub duration_secs: Option<f64>,
    /// Illustrated scene, for images
    pub scene_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

fn size_from_row(size: i64) -> u64 {
    u64::try_from(size).unwrap_or_default()
}

impl From<ImageRow> for MediaRecord {
    fn from(row: ImageRow) -> Self {
        Self {
            id: row.id,
            story_id: row.story_id,
            media_type: MediaType::Image,
            path: PathBuf::from(row.image_path),
            file_name: row.image_filename,
            size_bytes: size_from_row(row.image_size),
            duration_secs: None,
            scene_id: row.scene_id,
            created_at: row.created_at,
        }
    }
}

impl From<AudioRow> for MediaRecord {
    fn from(row: AudioRow) -> Self {
        Self {
            id: row.id,
            story_id: row.story_id,
            media_type: MediaType::Audio,
            path: PathBuf::from(row.audio_path),
            file_name: row.audio_filename,
            size_bytes: size_from_row(row.audio_size),
            duration_secs: row.audio_duration,
            scene_id: None,
            created_at: row.created_at,
        }
    }
}

impl From<VideoRow> for MediaRecord {
    fn from(row: VideoRow) -> Self {
        Self {
            id: row.id,
            story_id: row.story_id,
            media_type: MediaType::Video,
            path: PathBuf::from(row.video_path),
            file_name: row.video_filename,
            size_bytes: size_from_row(row.video_size),
            duration_secs: row.video_duration,
            scene_id: None,
            created_at: row.created_at,
        }
    }
}

/// A story with everything attached to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryRecord {
    pub id: i32,
    pub idiom: String,
    pub text: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Ordered by scene order
    pub scenes: Vec<SceneRecord>,
    /// Ordered by file name
    pub images: Vec<MediaRecord>,
    pub audio: Option<MediaRecord>,
    pub video: Option<MediaRecord>,
}

impl StoryRecord {
    pub(crate) fn hydrate(
        story: StoryRow,
        scenes: Vec<SceneRow>,
        images: Vec<ImageRow>,
        audio: Option<AudioRow>,
        video: Option<VideoRow>,
    ) -> Self {
        Self {
            id: story.id,
            idiom: story.idiom,
            text: story.story_text,
            created_at: story.created_at,
            updated_at: story.updated_at,
            scenes: scenes.into_iter().map(SceneRecord::from).collect(),
            images: images.into_iter().map(MediaRecord::from).collect(),
            audio: audio.map(MediaRecord::from),
            video: video.map(MediaRecord::from),
        }
    }

    /// Scene texts in story order.
    pub fn scene_texts(&self) -> Vec<&str> {
        self.scenes.iter().map(|s| s.text.as_str()).collect()
    }
}

/// One line of the story listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorySummary {
    pub id: i32,
    pub idiom: String,
    /// First characters of the story text
    pub preview: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub scene_count: i64,
    pub image_count: i64,
    pub audio_count: i64,
    pub video_count: i64,
}

/// Truncate story text for a listing.
///
/// # Examples
///
/// ```
/// use parable_catalog::preview;
///
/// assert_eq!(preview("短故事"), "短故事");
/// assert_eq!(preview(&"长".repeat(120)).chars().count(), 103);
/// ```
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let mut truncated: String = text.chars().take(PREVIEW_CHARS).collect();
        truncated.push_str("...");
        truncated
    } else {
        text.to_string()
    }
}

/// Count and total size of one media type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MediaTotals {
    pub count: i64,
    pub bytes: u64,
}

impl MediaTotals {
    pub(crate) fn from_sizes(sizes: &[i64]) -> Self {
        Self {
            count: sizes.len() as i64,
            bytes: sizes.iter().copied().map(size_from_row).sum(),
        }
    }
}

/// Aggregate catalog usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub stories: i64,
    pub scenes: i64,
    pub images: MediaTotals,
    pub audio: MediaTotals,
    pub videos: MediaTotals,
}

impl StorageStats {
    /// Bytes across all media types.
    pub fn total_bytes(&self) -> u64 {
        self.images.bytes + self.audio.bytes + self.videos.bytes
    }

    /// Total size in MiB.
    pub fn total_mib(&self) -> f64 {
        self.total_bytes() as f64 / (1024.0 * 1024.0)
    }
}

/// Outcome of saving an image set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SavedImages {
    /// Images that were written and recorded, in input order
    pub records: Vec<MediaRecord>,
    /// Inputs that could not be stored
    pub skipped: Vec<SkippedMedia>,
}

impl SavedImages {
    /// Durable paths of the stored images, in input order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.records.iter().map(|r| r.path.clone()).collect()
    }
}
