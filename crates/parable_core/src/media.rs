//! Media kinds shared by the catalog and the stats report.

use serde::{Deserialize, Serialize};

/// Type of durable media artifact.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum MediaType {
    /// Scene illustrations
    Image,
    /// Narration track
    Audio,
    /// Composed story video
    Video,
}

impl MediaType {
    /// Subdirectory of the storage root holding this media type.
    pub fn directory(&self) -> &'static str {
        match self {
            MediaType::Image => "images",
            MediaType::Audio => "audio",
            MediaType::Video => "videos",
        }
    }

    /// File extension used for durable files of this type.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Image => "jpg",
            MediaType::Audio => "mp3",
            MediaType::Video => "mp4",
        }
    }

    /// Durable file name for an artifact of this type.
    ///
    /// Images are numbered with a two-digit, 1-based index; audio is always
    /// `_01`; video is `_story`.
    pub fn file_name(&self, idiom: &str, index: usize) -> String {
        match self {
            MediaType::Image => format!("{}_{:02}.{}", idiom, index, self.extension()),
            MediaType::Audio => format!("{}_01.{}", idiom, self.extension()),
            MediaType::Video => format!("{}_story.{}", idiom, self.extension()),
        }
    }
}

/// An input item that was dropped instead of failing the whole operation.
///
/// `index` is the item's 0-based position in the caller's input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMedia {
    /// Position of the item in the input
    pub index: usize,
    /// Why it was skipped
    pub reason: String,
}

impl SkippedMedia {
    /// Record that input item `index` was skipped.
    pub fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}
