//! Synthesis tiers and the audio they produce.

use crate::PcmTrack;
use async_trait::async_trait;
use parable_core::Segment;
use parable_error::ParableResult;

/// Audio produced for one segment by one tier.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentAudio {
    /// Already-decoded samples
    Pcm(PcmTrack),
    /// Encoded bytes as returned by a speech engine
    Encoded {
        /// Raw file contents
        bytes: Vec<u8>,
        /// MIME type or extension reported by the producer, e.g. `audio/mpeg`
        format: String,
    },
}

impl SegmentAudio {
    /// Whether the tier produced no audio at all.
    pub fn is_empty(&self) -> bool {
        match self {
            SegmentAudio::Pcm(track) => track.is_empty(),
            SegmentAudio::Encoded { bytes, .. } => bytes.is_empty(),
        }
    }
}

/// One way of turning a segment into speech.
///
/// Tiers are tried in order; an `Err` moves on to the next tier, while any
/// `Ok`, even an empty one, ends the search for that segment.
#[async_trait]
pub trait SynthesisTier: Send + Sync {
    /// Short name recorded in segment outcomes and logs.
    fn name(&self) -> &str;

    /// Synthesize `segment`.
    async fn try_apply(&self, segment: &Segment) -> ParableResult<SegmentAudio>;
}

/// Decodes compressed speech (MP3 and the like) into PCM.
///
/// WAV is decoded in-process; everything else needs a decoder or the segment
/// is skipped at merge time.
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    /// Decode `bytes` of the given `format` to mono PCM at `sample_rate`.
    async fn decode(&self, bytes: &[u8], format: &str, sample_rate: u32)
    -> ParableResult<PcmTrack>;
}
