//! Named composition styles.

use crate::synchronizer::{CompositionReport, VideoSynchronizer};
use crate::transition::{CutTransition, TransitionRegistry};
use async_trait::async_trait;
use parable_error::{InputError, InputErrorKind, ParableResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A way of turning images and narration into a story video.
#[async_trait]
pub trait VideoComposer: Send + Sync {
    /// Registry name.
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str;

    /// Compose `images` over `audio` for `idiom`.
    ///
    /// `transition` names a strategy; composers may ignore it.
    async fn compose(
        &self,
        images: &[PathBuf],
        audio: &Path,
        transition: &str,
        idiom: &str,
    ) -> ParableResult<CompositionReport>;
}

/// Hard cuts only; the requested transition is ignored.
#[derive(Debug, Clone)]
pub struct SimpleComposer {
    synchronizer: Arc<VideoSynchronizer>,
}

impl SimpleComposer {
    /// Composer rendering through `synchronizer`.
    pub fn new(synchronizer: Arc<VideoSynchronizer>) -> Self {
        Self { synchronizer }
    }
}

#[async_trait]
impl VideoComposer for SimpleComposer {
    fn name(&self) -> &str {
        "simple"
    }

    fn description(&self) -> &str {
        "Images joined with hard cuts"
    }

    async fn compose(
        &self,
        images: &[PathBuf],
        audio: &Path,
        transition: &str,
        idiom: &str,
    ) -> ParableResult<CompositionReport> {
        if transition != "none" {
            tracing::debug!(requested = transition, "Simple composer ignores transitions");
        }
        self.synchronizer
            .synchronize(images, audio, &CutTransition, idiom)
            .await
    }
}

/// Applies the requested transition between images.
#[derive(Debug, Clone)]
pub struct TransitionComposer {
    synchronizer: Arc<VideoSynchronizer>,
    transitions: TransitionRegistry,
}

impl TransitionComposer {
    /// Composer resolving transition names in `transitions`.
    pub fn new(synchronizer: Arc<VideoSynchronizer>, transitions: TransitionRegistry) -> Self {
        Self {
            synchronizer,
            transitions,
        }
    }

    /// Strategies this composer can apply.
    pub fn transitions(&self) -> &TransitionRegistry {
        &self.transitions
    }
}

#[async_trait]
impl VideoComposer for TransitionComposer {
    fn name(&self) -> &str {
        "enhanced"
    }

    fn description(&self) -> &str {
        "Images joined with the requested transition"
    }

    async fn compose(
        &self,
        images: &[PathBuf],
        audio: &Path,
        transition: &str,
        idiom: &str,
    ) -> ParableResult<CompositionReport> {
        let strategy = self.transitions.get(transition)?;
        self.synchronizer
            .synchronize(images, audio, strategy.as_ref(), idiom)
            .await
    }
}

/// Lookup table of composers.
#[derive(Clone, Default)]
pub struct ComposerRegistry {
    composers: HashMap<String, Arc<dyn VideoComposer>>,
}

impl std::fmt::Debug for ComposerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposerRegistry")
            .field("composers", &self.names())
            .finish()
    }
}

impl ComposerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `simple` and `enhanced`.
    pub fn with_defaults(synchronizer: Arc<VideoSynchronizer>, transitions: TransitionRegistry) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SimpleComposer::new(synchronizer.clone())));
        registry.register(Arc::new(TransitionComposer::new(synchronizer, transitions)));
        registry
    }

    /// Register a composer, replacing any with the same name.
    #[tracing::instrument(skip(self, composer), fields(composer = composer.name()))]
    pub fn register(&mut self, composer: Arc<dyn VideoComposer>) {
        let name = composer.name().to_string();
        if self.composers.contains_key(&name) {
            tracing::warn!(composer = %name, "Composer already registered, replacing it");
        }
        self.composers.insert(name, composer);
    }

    /// Look up a composer by name.
    ///
    /// # Errors
    ///
    /// Returns [`InputErrorKind::UnknownComposer`] for unregistered names.
    pub fn get(&self, name: &str) -> ParableResult<Arc<dyn VideoComposer>> {
        self.composers
            .get(name)
            .cloned()
            .ok_or_else(|| InputError::new(InputErrorKind::UnknownComposer(name.to_string())).into())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.composers.keys().cloned().collect();
        names.sort();
        names
    }
}
