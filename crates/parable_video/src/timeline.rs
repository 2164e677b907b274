//! Clips and the track they form.

use serde::Serialize;
use std::path::PathBuf;

/// Visual effect used where a clip enters the track.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Hard cut
    #[default]
    Cut,
    /// Cross-dissolve
    Fade,
    /// Incoming clip pushes in from the right
    Slide,
    /// Incoming clip zooms in over the outgoing one
    Zoom,
    /// Radial sweep around the frame centre
    Rotate,
    /// Left-to-right wipe
    Wipe,
}

impl Effect {
    /// Name of the ffmpeg `xfade` transition rendering this effect.
    ///
    /// `None` for [`Effect::Cut`], which is rendered with `concat`.
    pub fn xfade_name(&self) -> Option<&'static str> {
        match self {
            Effect::Cut => None,
            Effect::Fade => Some("fade"),
            Effect::Slide => Some("slideleft"),
            Effect::Zoom => Some("zoomin"),
            Effect::Rotate => Some("radial"),
            Effect::Wipe => Some("wipeleft"),
        }
    }
}

/// One still image held on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clip {
    /// Prepared frame
    pub source: PathBuf,
    /// Seconds the clip is shown, including any overlap into the next clip
    pub duration: f64,
    /// Seconds this clip overlaps the previous one
    pub overlap_in: f64,
    /// Effect where this clip enters
    pub effect: Effect,
}

impl Clip {
    /// A hard-cut clip.
    pub fn still(source: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            source: source.into(),
            duration,
            overlap_in: 0.0,
            effect: Effect::Cut,
        }
    }
}

/// Length of the track formed by `clips`.
///
/// Overlapping regions are counted once: `Σduration − Σoverlap_in`.
pub fn track_duration(clips: &[Clip]) -> f64 {
    clips.iter().map(|c| c.duration - c.overlap_in).sum()
}

/// Hard-cut clips of equal length, one per frame.
pub fn uniform_clips(frames: &[PathBuf], per_clip: f64) -> Vec<Clip> {
    frames.iter().map(|f| Clip::still(f, per_clip)).collect()
}
