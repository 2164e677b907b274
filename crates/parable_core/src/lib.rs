//! Shared building blocks for the Parable idiom-to-video pipeline.
//!
//! This crate holds what every other Parable crate agrees on:
//!
//! - [`ParableConfig`] and its sections, loaded with layered precedence
//! - The collaborator traits for the external generators
//! - Default [`SentenceSegmenter`] and [`SentenceSceneExtractor`] implementations
//! - [`bounded`], the deadline/cancellation wrapper for external calls
//! - Idiom validation and the durable [`MediaType`] naming convention

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bounded;
mod collaborators;
mod config;
mod idiom;
mod media;
mod scene;
mod segment;

pub use bounded::bounded;
pub use collaborators::{ImageGenerator, SceneExtractor, Segment, StoryGenerator, TextSegmenter};
pub use config::{
    AudioConfig, AudioConfigBuilder, CacheSettings, GeneratorConfig, ParableConfig,
    PipelineConfig, StorageConfig, StorageConfigBuilder, VideoConfig, VideoConfigBuilder,
};
pub use idiom::validate_idiom;
pub use media::{MediaType, SkippedMedia};
pub use scene::SentenceSceneExtractor;
pub use segment::{SENTENCE_TERMINATORS, SentenceSegmenter};

pub use tokio_util::sync::CancellationToken;
