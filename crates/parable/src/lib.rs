//! Parable - idiom to narrated story video.
//!
//! Parable chains external generators (story text, scene illustrations,
//! speech) and wraps them in the parts that have to be right every time:
//!
//! - **Artifact cache**: content-addressed memoization of every stage
//! - **Asset catalog**: SQLite record of stories, scenes and media files
//! - **Narration**: tiered speech synthesis that never comes back empty
//! - **Video**: duration-reconciled assembly with named transitions
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use parable::{ParableConfig, RunOptions, Services};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let services = Services::open(ParableConfig::load()?).await?;
//!     let pipeline = services.story_pipeline()?;
//!
//!     let outcome = pipeline.run("守株待兔", RunOptions::default()).await?;
//!     println!("Video: {}", outcome.video.path.display());
//!
//!     services.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Parable is organized as a workspace with focused crates:
//!
//! - `parable_error` - Error types
//! - `parable_core` - Configuration, collaborator traits, shared types
//! - `parable_cache` - Artifact cache
//! - `parable_catalog` - Asset catalog
//! - `parable_audio` - Narration synthesis
//! - `parable_video` - Video assembly
//!
//! This crate (`parable`) re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod generators;
mod pipeline;
mod services;

// Re-export workspace crates
pub use parable_audio::*;
pub use parable_cache::*;
pub use parable_catalog::{
    AssetCatalog, ImageInput, MediaRecord, SavedImages, SceneRecord, SqliteAssetCatalog,
    StorageStats, StoryRecord, StorySummary,
};
pub use parable_core::*;
pub use parable_error::*;
pub use parable_video::*;

pub use generators::{
    ChatChoice, ChatChoiceMessage, ChatCompletionResponse, ChatStoryGenerator,
    HttpImageGenerator,
};
pub use pipeline::{Collaborators, PipelineOutcome, RunOptions, RunOptionsBuilder, StoryPipeline};
pub use services::Services;
