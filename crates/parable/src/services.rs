//! Opening the production services from configuration.

use crate::{ChatStoryGenerator, Collaborators, HttpImageGenerator, StoryPipeline};
use parable_audio::AudioSynthesisPipeline;
use parable_cache::{ArtifactCache, ArtifactCacheConfig};
use parable_catalog::SqliteAssetCatalog;
use parable_core::{ParableConfig, SentenceSceneExtractor};
use parable_error::ParableResult;
use parable_video::FfmpegEncoder;
use std::sync::Arc;

/// The cache and catalog opened for one process.
#[derive(Debug, derive_getters::Getters)]
pub struct Services {
    /// Loaded configuration
    config: ParableConfig,
    /// The artifact cache
    cache: ArtifactCache,
    /// The asset catalog
    catalog: Arc<SqliteAssetCatalog>,
}

impl Services {
    /// Open the artifact cache and the asset catalog described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory, the storage tree or the
    /// database cannot be opened.
    #[tracing::instrument(skip(config))]
    pub async fn open(config: ParableConfig) -> ParableResult<Self> {
        let cache = ArtifactCache::open(ArtifactCacheConfig::from_config(&config)).await?;
        let catalog = Arc::new(SqliteAssetCatalog::open(&config.storage).await?);
        Ok(Self {
            config,
            cache,
            catalog,
        })
    }

    /// A pipeline using the HTTP generators and `ffmpeg`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a generator endpoint or API key is
    /// missing.
    pub fn story_pipeline(&self) -> ParableResult<StoryPipeline> {
        let video = &self.config.video;
        let encoder = Arc::new(FfmpegEncoder::from_config(video));
        let collaborators = Collaborators {
            story: Arc::new(ChatStoryGenerator::from_config(&self.config.generators)?),
            scenes: Arc::new(SentenceSceneExtractor),
            images: Arc::new(HttpImageGenerator::from_config(
                &self.config.generators,
                video.width,
                video.height,
            )?),
        };
        let audio =
            AudioSynthesisPipeline::from_config(self.config.audio.clone()).with_decoder(encoder.clone());

        Ok(StoryPipeline::new(
            self.config.clone(),
            self.cache.clone(),
            self.catalog.clone(),
            collaborators,
            encoder,
        )
        .with_audio(audio))
    }

    /// Flush the catalog and release it.
    ///
    /// # Errors
    ///
    /// Returns an error if the final WAL checkpoint fails.
    pub async fn close(self) -> ParableResult<()> {
        match Arc::try_unwrap(self.catalog) {
            Ok(catalog) => catalog.close().await,
            Err(_) => {
                tracing::warn!("Catalog still shared at shutdown, skipping checkpoint");
                Ok(())
            }
        }
    }
}
