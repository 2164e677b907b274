//! Per-segment tier fallback and merging.

use crate::pcm::is_wav;
use crate::tiers::{CommandSpeechTier, HttpSpeechTier, SyntheticTier};
use crate::{AudioDecoder, PcmTrack, SegmentAudio, SynthesisTier};
use futures::stream::{self, StreamExt};
use parable_core::{
    AudioConfig, CancellationToken, Segment, SentenceSegmenter, TextSegmenter, bounded,
};
use parable_error::{
    AudioError, AudioErrorKind, GeneratorError, GeneratorErrorKind, InputError, InputErrorKind,
    ParableResult,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// How one segment was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SegmentOutcome {
    /// Merged into the track using audio from `tier`
    Synthesized {
        /// Segment position
        index: usize,
        /// Name of the tier that produced the audio
        tier: String,
    },
    /// Left out of the track
    Skipped {
        /// Segment position
        index: usize,
        /// Why the segment was dropped
        reason: String,
    },
}

impl SegmentOutcome {
    /// Segment position.
    pub fn index(&self) -> usize {
        match self {
            SegmentOutcome::Synthesized { index, .. } | SegmentOutcome::Skipped { index, .. } => {
                *index
            }
        }
    }

    /// Tier that produced the merged audio, if any.
    pub fn tier(&self) -> Option<&str> {
        match self {
            SegmentOutcome::Synthesized { tier, .. } => Some(tier),
            SegmentOutcome::Skipped { .. } => None,
        }
    }
}

/// Merged narration plus a record of how each segment was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationTrack {
    /// Mono track at the configured sample rate
    pub track: PcmTrack,
    /// One entry per input segment, in order
    pub outcomes: Vec<SegmentOutcome>,
}

impl NarrationTrack {
    /// Playback length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.track.duration_secs()
    }

    /// Segments that made it into the track.
    pub fn merged_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SegmentOutcome::Synthesized { .. }))
            .count()
    }

    /// Write the merged track as 16-bit mono WAV.
    ///
    /// # Errors
    ///
    /// Returns an encoding or I/O error.
    pub async fn write_wav(&self, path: &Path) -> ParableResult<()> {
        Ok(self.track.write_wav(path).await?)
    }
}

/// Result of running the tier chain on one segment.
enum Resolved {
    Produced { tier: String, audio: SegmentAudio },
    Failed(String),
}

/// Turns narration text into one continuous track.
///
/// Every segment walks the tier list in order until a tier returns `Ok`.
/// The synthetic tier is always last, so non-empty text always yields a
/// non-empty track unless the caller cancels.
///
/// # Example
///
/// ```
/// use parable_audio::AudioSynthesisPipeline;
/// use parable_core::{AudioConfig, CancellationToken};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // No endpoint or engine configured: only the synthetic tier runs.
/// let pipeline = AudioSynthesisPipeline::from_config(AudioConfig::default());
/// let narration = pipeline.narrate("农夫种田。", &CancellationToken::new()).await?;
/// assert!((narration.duration_secs() - 1.5).abs() < 0.01);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AudioSynthesisPipeline {
    config: AudioConfig,
    tiers: Vec<Arc<dyn SynthesisTier>>,
    fallback: Arc<dyn SynthesisTier>,
    decoder: Option<Arc<dyn AudioDecoder>>,
}

impl std::fmt::Debug for AudioSynthesisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSynthesisPipeline")
            .field("tiers", &self.tier_names())
            .field("decoder", &self.decoder.is_some())
            .finish()
    }
}

impl AudioSynthesisPipeline {
    /// Pipeline with no speech tiers; only the synthetic fallback.
    pub fn new(config: AudioConfig) -> Self {
        let fallback = Arc::new(SyntheticTier::new(
            config.sample_rate,
            config.seconds_per_char,
        ));
        Self {
            config,
            tiers: Vec::new(),
            fallback,
            decoder: None,
        }
    }

    /// Pipeline with the tiers the configuration enables.
    ///
    /// The HTTP tier is added when `tts_endpoint` is set, then the local
    /// engine when `local_engine` is set.
    pub fn from_config(config: AudioConfig) -> Self {
        let mut pipeline = Self::new(config.clone());
        if let Some(endpoint) = &config.tts_endpoint {
            pipeline = pipeline.with_tier(Arc::new(HttpSpeechTier::new(endpoint.clone())));
        }
        if let Some(tier) = config
            .local_engine
            .as_deref()
            .and_then(CommandSpeechTier::from_command_line)
        {
            pipeline = pipeline.with_tier(Arc::new(tier));
        }
        pipeline
    }

    /// Add a tier ahead of the synthetic fallback.
    pub fn with_tier(mut self, tier: Arc<dyn SynthesisTier>) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Decoder for compressed tier output.
    pub fn with_decoder(mut self, decoder: Arc<dyn AudioDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Tier names in the order they are tried.
    pub fn tier_names(&self) -> Vec<String> {
        self.all_tiers().map(|t| t.name().to_string()).collect()
    }

    fn all_tiers(&self) -> impl Iterator<Item = &Arc<dyn SynthesisTier>> {
        self.tiers.iter().chain(std::iter::once(&self.fallback))
    }

    /// Segment `text` and synthesize it.
    ///
    /// # Errors
    ///
    /// Returns [`InputErrorKind::EmptyText`] for blank text, plus the errors of
    /// [`AudioSynthesisPipeline::synthesize`].
    pub async fn narrate(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> ParableResult<NarrationTrack> {
        if text.trim().is_empty() {
            return Err(InputError::new(InputErrorKind::EmptyText).into());
        }
        let segments = SentenceSegmenter::new(self.config.max_segment_chars).segment(text);
        self.synthesize(&segments, cancel).await
    }

    /// Synthesize pre-split segments and merge them in order.
    ///
    /// # Errors
    ///
    /// Returns [`InputErrorKind::EmptyText`] when there are no segments,
    /// [`GeneratorErrorKind::Cancelled`] if `cancel` fires, and
    /// [`AudioErrorKind::NoMergeableSegments`] when nothing could be merged.
    #[tracing::instrument(skip(self, segments, cancel), fields(segments = segments.len(), tiers = self.tiers.len() + 1))]
    pub async fn synthesize(
        &self,
        segments: &[Segment],
        cancel: &CancellationToken,
    ) -> ParableResult<NarrationTrack> {
        if segments.is_empty() {
            return Err(InputError::new(InputErrorKind::EmptyText).into());
        }

        let resolved: Vec<Resolved> = stream::iter(segments)
            .map(|segment| self.resolve(segment, cancel))
            .buffered(self.config.max_concurrent_segments.max(1))
            .collect()
            .await;

        if cancel.is_cancelled() {
            return Err(GeneratorError::new(GeneratorErrorKind::Cancelled).into());
        }

        let mut track = PcmTrack::empty(self.config.sample_rate);
        let mut outcomes = Vec::with_capacity(segments.len());
        for (segment, result) in segments.iter().zip(resolved) {
            let index = *segment.index();
            let outcome = match result {
                Resolved::Failed(reason) => SegmentOutcome::Skipped { index, reason },
                Resolved::Produced { tier, audio } => match self.to_pcm(audio).await {
                    Ok(pcm) if pcm.is_empty() => SegmentOutcome::Skipped {
                        index,
                        reason: format!("{} produced no audio", tier),
                    },
                    Ok(pcm) => {
                        track.append(pcm);
                        SegmentOutcome::Synthesized { index, tier }
                    }
                    Err(reason) => SegmentOutcome::Skipped { index, reason },
                },
            };

            if let SegmentOutcome::Skipped { reason, .. } = &outcome {
                tracing::warn!(index, reason = %reason, "Skipping unmergeable segment");
            }
            outcomes.push(outcome);
        }

        if track.is_empty() {
            return Err(AudioError::new(AudioErrorKind::NoMergeableSegments(segments.len())).into());
        }

        tracing::info!(
            duration_secs = track.duration_secs(),
            merged = outcomes.iter().filter(|o| o.tier().is_some()).count(),
            "Narration synthesized"
        );
        Ok(NarrationTrack { track, outcomes })
    }

    async fn resolve(&self, segment: &Segment, cancel: &CancellationToken) -> Resolved {
        let timeout = self.config.tier_timeout();
        let mut last_error = String::from("no tier attempted");

        for tier in self.all_tiers() {
            match bounded(tier.name(), timeout, cancel, tier.try_apply(segment)).await {
                Ok(audio) => {
                    tracing::debug!(index = segment.index(), tier = tier.name(), "Segment synthesized");
                    return Resolved::Produced {
                        tier: tier.name().to_string(),
                        audio,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        index = segment.index(),
                        tier = tier.name(),
                        error = %e,
                        "Tier failed, trying next"
                    );
                    last_error = format!("{}: {}", tier.name(), e);
                }
            }
        }

        Resolved::Failed(last_error)
    }

    async fn to_pcm(&self, audio: SegmentAudio) -> Result<PcmTrack, String> {
        match audio {
            SegmentAudio::Pcm(track) => Ok(track),
            SegmentAudio::Encoded { bytes, .. } if bytes.is_empty() => {
                Ok(PcmTrack::empty(self.config.sample_rate))
            }
            SegmentAudio::Encoded { bytes, .. } if is_wav(&bytes) => {
                PcmTrack::from_wav_bytes(&bytes).map_err(|e| e.to_string())
            }
            SegmentAudio::Encoded { bytes, format } => match &self.decoder {
                Some(decoder) => decoder
                    .decode(&bytes, &format, self.config.sample_rate)
                    .await
                    .map_err(|e| e.to_string()),
                None => Err(format!("no decoder available for {}", format)),
            },
        }
    }
}
