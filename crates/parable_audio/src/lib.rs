//! Narration synthesis for Parable.
//!
//! Text is split into bounded segments and each segment walks an ordered
//! list of [`SynthesisTier`]s:
//!
//! 1. [`HttpSpeechTier`], a networked TTS service
//! 2. [`CommandSpeechTier`], an offline engine such as `espeak-ng`
//! 3. [`SyntheticTier`], deterministic tones whose length follows the text
//!
//! A tier that errors (including a timeout or a missing executable) hands the
//! segment to the next one. The results are normalized to mono at one sample
//! rate and concatenated in reading order into a [`NarrationTrack`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod pcm;
mod pipeline;
mod tier;
mod tiers;

pub use pcm::{PcmTrack, is_wav};
pub use pipeline::{AudioSynthesisPipeline, NarrationTrack, SegmentOutcome};
pub use tier::{AudioDecoder, SegmentAudio, SynthesisTier};
pub use tiers::{CommandSpeechTier, HttpSpeechTier, SyntheticTier};
