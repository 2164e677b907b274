//! Stage artifact caching for the Parable pipeline.
//!
//! Each pipeline stage (story text, scenes, images, narration) is keyed by a
//! SHA-256 digest over its stage name and input, and its output is kept on
//! disk so a restarted process can skip work it has already done. The cache is
//! never authoritative: every read failure degrades to a miss.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod entry;
mod key;

pub use cache::{ArtifactCache, ArtifactCacheConfig, ArtifactCacheConfigBuilder};
pub use entry::CacheEntry;
pub use key::CacheKey;
