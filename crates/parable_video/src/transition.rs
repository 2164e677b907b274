//! Transition strategies and the registry that names them.

use crate::timeline::{Clip, Effect};
use parable_error::{InputError, InputErrorKind, ParableResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Rewrites a hard-cut clip sequence to add transitions.
///
/// Implementations must keep [`track_duration`](crate::track_duration)
/// unchanged: any time one clip spends overlapping its neighbour has to be
/// added back to the clip it overlaps.
pub trait TransitionStrategy: Send + Sync {
    /// Registry name, e.g. `fade`.
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str;

    /// Apply the transition to `clips` using at most `overlap` seconds per boundary.
    fn apply(&self, clips: Vec<Clip>, overlap: f64) -> Vec<Clip>;
}

/// Hard cuts only.
#[derive(Debug, Clone, Copy, Default)]
pub struct CutTransition;

impl TransitionStrategy for CutTransition {
    fn name(&self) -> &str {
        "none"
    }

    fn description(&self) -> &str {
        "Hard cuts between images"
    }

    fn apply(&self, clips: Vec<Clip>, _overlap: f64) -> Vec<Clip> {
        clips
            .into_iter()
            .map(|clip| Clip {
                overlap_in: 0.0,
                effect: Effect::Cut,
                ..clip
            })
            .collect()
    }
}

/// Overlaps each pair of neighbouring clips and blends them with one effect.
///
/// Every outgoing clip is lengthened by the overlap and the incoming clip
/// records it in `overlap_in`, so the track length does not change.
#[derive(Debug, Clone)]
pub struct OverlapTransition {
    name: String,
    description: String,
    effect: Effect,
}

impl OverlapTransition {
    /// Strategy registered as `name` that blends with `effect`.
    pub fn new(name: impl Into<String>, description: impl Into<String>, effect: Effect) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            effect,
        }
    }

    /// The effect used at each boundary.
    pub fn effect(&self) -> Effect {
        self.effect
    }
}

impl TransitionStrategy for OverlapTransition {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&self, mut clips: Vec<Clip>, overlap: f64) -> Vec<Clip> {
        let overlap = overlap.max(0.0);
        let count = clips.len();
        for i in 0..count {
            clips[i].overlap_in = 0.0;
            clips[i].effect = Effect::Cut;
            if i > 0 && overlap > 0.0 {
                clips[i].overlap_in = overlap;
                clips[i].effect = self.effect;
            }
            if i + 1 < count {
                clips[i].duration += overlap;
            }
        }
        clips
    }
}

/// Name and description of a registered strategy.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TransitionInfo {
    /// Registry name
    pub name: String,
    /// One-line description
    pub description: String,
}

/// Lookup table of transition strategies.
#[derive(Clone)]
pub struct TransitionRegistry {
    strategies: HashMap<String, Arc<dyn TransitionStrategy>>,
}

impl std::fmt::Debug for TransitionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

impl Default for TransitionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TransitionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registry holding `none`, `fade`, `slide`, `zoom`, `rotate` and `wipe`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CutTransition));
        for (name, description, effect) in [
            ("fade", "Cross-dissolve between images", Effect::Fade),
            ("slide", "Next image slides in from the right", Effect::Slide),
            ("zoom", "Next image zooms in over the current one", Effect::Zoom),
            ("rotate", "Radial sweep into the next image", Effect::Rotate),
            ("wipe", "Left-to-right wipe", Effect::Wipe),
        ] {
            registry.register(Arc::new(OverlapTransition::new(name, description, effect)));
        }
        registry
    }

    /// Register a strategy, replacing any with the same name.
    #[tracing::instrument(skip(self, strategy), fields(transition = strategy.name()))]
    pub fn register(&mut self, strategy: Arc<dyn TransitionStrategy>) {
        let name = strategy.name().to_string();
        if self.strategies.contains_key(&name) {
            tracing::warn!(transition = %name, "Transition already registered, replacing it");
        }
        self.strategies.insert(name, strategy);
    }

    /// Look up a strategy by name.
    ///
    /// # Errors
    ///
    /// Returns [`InputErrorKind::UnknownTransition`] for unregistered names.
    pub fn get(&self, name: &str) -> ParableResult<Arc<dyn TransitionStrategy>> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| InputError::new(InputErrorKind::UnknownTransition(name.to_string())).into())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.strategies.keys().cloned().collect();
        names.sort();
        names
    }

    /// Name and description of every strategy, sorted by name.
    pub fn list(&self) -> Vec<TransitionInfo> {
        let mut infos: Vec<TransitionInfo> = self
            .strategies
            .values()
            .map(|s| TransitionInfo {
                name: s.name().to_string(),
                description: s.description().to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Number of registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether no strategy is registered.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
