//! Reconciling the image track with the narration length.

use crate::timeline::{Clip, track_duration};
use parable_error::{ParableResult, SyncError, SyncErrorKind};
use serde::Serialize;
use std::path::PathBuf;

/// Differences below this many seconds are left alone.
pub const AS_IS_TOLERANCE_SECS: f64 = 1.0;

/// How the video track was conformed to the audio.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    /// Durations already agree; audio attached unchanged
    AsIs,
    /// Video repeated, then cut at the audio length
    LoopVideo,
    /// Video cut at the audio length
    TruncateVideo,
}

/// Everything the encoder needs to render one story video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncPlan {
    /// Clips in playback order, already repeated when looping
    pub clips: Vec<Clip>,
    /// Narration track
    pub audio: PathBuf,
    /// Length of the exported video in seconds
    pub target_secs: f64,
    /// Narration length the plan was reconciled against
    pub audio_secs: f64,
    /// Branch taken during reconciliation
    pub action: ReconcileAction,
}

impl SyncPlan {
    /// Length of the clip track before the final cut.
    pub fn track_secs(&self) -> f64 {
        track_duration(&self.clips)
    }
}

/// Conform `clips` to `audio_secs` and check the result.
///
/// Within [`AS_IS_TOLERANCE_SECS`] the track is used unchanged. A shorter
/// track is looped whole, a longer one is cut; either way the exported length
/// is the audio length.
///
/// # Errors
///
/// Returns [`SyncErrorKind::ToleranceViolation`] when the track is empty or
/// the plan ends up more than `frame_secs` away from the audio.
pub fn reconcile(
    clips: Vec<Clip>,
    audio: PathBuf,
    audio_secs: f64,
    frame_secs: f64,
) -> ParableResult<SyncPlan> {
    let video_secs = track_duration(&clips);
    let violation = |video_seconds: f64, tolerance_seconds: f64| {
        SyncError::new(SyncErrorKind::ToleranceViolation {
            video_seconds,
            audio_seconds: audio_secs,
            tolerance_seconds,
        })
    };

    if !video_secs.is_finite() || video_secs <= 0.0 || !audio_secs.is_finite() || audio_secs <= 0.0
    {
        return Err(violation(video_secs, frame_secs).into());
    }

    let diff = audio_secs - video_secs;
    let (clips, target_secs, action) = if diff.abs() < AS_IS_TOLERANCE_SECS {
        (clips, video_secs, ReconcileAction::AsIs)
    } else if diff > 0.0 {
        let repeats = (audio_secs / video_secs).ceil() as usize;
        let looped = clips
            .iter()
            .cycle()
            .take(clips.len() * repeats)
            .cloned()
            .collect();
        (looped, audio_secs, ReconcileAction::LoopVideo)
    } else {
        (clips, audio_secs, ReconcileAction::TruncateVideo)
    };

    let plan = SyncPlan {
        clips,
        audio,
        target_secs,
        audio_secs,
        action,
    };

    let tolerance = match action {
        ReconcileAction::AsIs => AS_IS_TOLERANCE_SECS,
        ReconcileAction::LoopVideo | ReconcileAction::TruncateVideo => frame_secs,
    };
    if (plan.target_secs - audio_secs).abs() > tolerance || plan.track_secs() + frame_secs < target_secs {
        return Err(violation(plan.target_secs, tolerance).into());
    }

    tracing::debug!(
        video_secs,
        audio_secs,
        target_secs,
        action = %action,
        "Track reconciled"
    );
    Ok(plan)
}
