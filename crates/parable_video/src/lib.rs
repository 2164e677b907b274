//! Story video assembly for Parable.
//!
//! Given an ordered set of images and one narration track, this crate:
//!
//! 1. Decodes and letterboxes the images, skipping any that cannot be read
//! 2. Holds each image for an equal share of the narration length
//! 3. Rewrites the clip list with a named [`TransitionStrategy`]
//! 4. Conforms the track to the narration ([`reconcile`])
//! 5. Renders the resulting [`SyncPlan`] through a [`VideoEncoder`]
//!
//! [`FfmpegEncoder`] is the production encoder; tests substitute their own.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod composer;
mod encoder;
mod frames;
mod sync;
mod synchronizer;
mod timeline;
mod transition;

pub use composer::{ComposerRegistry, SimpleComposer, TransitionComposer, VideoComposer};
pub use encoder::{FfmpegEncoder, VideoEncoder};
pub use frames::{FramePreparer, PreparedFrames};
pub use sync::{AS_IS_TOLERANCE_SECS, ReconcileAction, SyncPlan, reconcile};
pub use synchronizer::{CompositionReport, VideoSynchronizer};
pub use timeline::{Clip, Effect, track_duration, uniform_clips};
pub use transition::{
    CutTransition, OverlapTransition, TransitionInfo, TransitionRegistry, TransitionStrategy,
};
