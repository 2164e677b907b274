//! SQLite asset catalog for Parable.
//!
//! The catalog is the authoritative record of every story the pipeline has
//! produced: story text, ordered scenes, and the image, audio and video files
//! kept under the storage root.
//!
//! # Features
//!
//! - Diesel-based SQLite integration with embedded migrations
//! - Atomic story and scene upserts
//! - Media files written before their rows, checked against their size on disk
//! - Cascading deletes that also remove files
//!
//! # Example
//!
//! ```rust,ignore
//! use parable_catalog::{AssetCatalog, SqliteAssetCatalog};
//! use parable_core::StorageConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = SqliteAssetCatalog::open(&StorageConfig::under("/tmp/parable")).await?;
//! for summary in catalog.list_stories(20).await? {
//!     println!("{}: {}", summary.idiom, summary.preview);
//! }
//! # Ok(())
//! # }
//! ```

mod catalog;
mod connection;
mod files;
mod locks;
mod models;
mod records;
mod sqlite_catalog;

// Public modules for external access
pub mod schema;

pub use catalog::AssetCatalog;
pub use connection::{CatalogPool, build_pool, run_migrations};
pub use files::{
    JPEG_QUALITY, MediaLayout, StagedFile, copy_atomic, encode_jpeg, verify_size, write_atomic,
};
pub use locks::IdiomLocks;
pub use models::{
    AudioRow, ImageRow, NewAudioRow, NewImageRow, NewSceneRow, NewStoryRow, NewVideoRow,
    SceneRow, StoryRow, VideoRow,
};
pub use records::{
    ImageInput, MediaRecord, MediaTotals, PREVIEW_CHARS, SavedImages, SceneRecord,
    StorageStats, StoryRecord, StorySummary, preview,
};
pub use sqlite_catalog::SqliteAssetCatalog;

use parable_error::DatabaseError;

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
