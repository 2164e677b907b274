//! Tests for tiered narration synthesis.

use async_trait::async_trait;
use parable_audio::{
    AudioDecoder, AudioSynthesisPipeline, CommandSpeechTier, PcmTrack, SegmentAudio,
    SegmentOutcome, SynthesisTier,
};
use parable_core::{AudioConfig, AudioConfigBuilder, CancellationToken, Segment};
use parable_error::{
    AudioErrorKind, GeneratorError, GeneratorErrorKind, HttpError, ParableErrorKind,
    ParableResult,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const RATE: u32 = 22_050;

/// Tier that always fails like an unreachable network service.
struct NetworkDown {
    calls: AtomicUsize,
}

#[async_trait]
impl SynthesisTier for NetworkDown {
    fn name(&self) -> &str {
        "network"
    }

    async fn try_apply(&self, _segment: &Segment) -> ParableResult<SegmentAudio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HttpError::new("connection refused").into())
    }
}

/// Tier returning a constant tone whose value encodes the segment index.
/// Later segments finish first to exercise ordered merging.
struct IndexedTone;

#[async_trait]
impl SynthesisTier for IndexedTone {
    fn name(&self) -> &str {
        "indexed"
    }

    async fn try_apply(&self, segment: &Segment) -> ParableResult<SegmentAudio> {
        let index = *segment.index();
        tokio::time::sleep(Duration::from_millis(50u64.saturating_sub(index as u64 * 10))).await;
        let value = (index + 1) as f32 / 10.0;
        Ok(SegmentAudio::Pcm(PcmTrack::new(vec![value; 100], RATE)))
    }
}

/// Tier that returns success with no audio.
struct Silent;

#[async_trait]
impl SynthesisTier for Silent {
    fn name(&self) -> &str {
        "silent"
    }

    async fn try_apply(&self, _segment: &Segment) -> ParableResult<SegmentAudio> {
        Ok(SegmentAudio::Encoded {
            bytes: Vec::new(),
            format: "audio/mpeg".to_string(),
        })
    }
}

/// Tier returning fixed encoded bytes.
struct Encoded {
    bytes: Vec<u8>,
    format: &'static str,
}

#[async_trait]
impl SynthesisTier for Encoded {
    fn name(&self) -> &str {
        "encoded"
    }

    async fn try_apply(&self, _segment: &Segment) -> ParableResult<SegmentAudio> {
        Ok(SegmentAudio::Encoded {
            bytes: self.bytes.clone(),
            format: self.format.to_string(),
        })
    }
}

/// Tier that never finishes in time.
struct Hanging;

#[async_trait]
impl SynthesisTier for Hanging {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn try_apply(&self, _segment: &Segment) -> ParableResult<SegmentAudio> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(GeneratorError::failed("hanging", "unreachable").into())
    }
}

/// Decoder that turns any input into half a second of silence.
struct FixedDecoder;

#[async_trait]
impl AudioDecoder for FixedDecoder {
    async fn decode(&self, _bytes: &[u8], _format: &str, sample_rate: u32) -> ParableResult<PcmTrack> {
        Ok(PcmTrack::new(vec![0.0; sample_rate as usize / 2], sample_rate))
    }
}

fn segments(texts: &[&str]) -> Vec<Segment> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| Segment::new(i, *t))
        .collect()
}

#[tokio::test]
async fn test_falls_back_to_synthetic_when_speech_tiers_fail() {
    let network = Arc::new(NetworkDown {
        calls: AtomicUsize::new(0),
    });
    let pipeline = AudioSynthesisPipeline::new(AudioConfig::default())
        .with_tier(network.clone())
        .with_tier(Arc::new(CommandSpeechTier::new(
            "parable-test-missing-tts-engine",
            vec!["--stdout".to_string()],
        )));

    let texts = ["从前宋国有个农夫。", "一只兔子撞死在树桩上。", "他天天守着树桩。"];
    let total_chars: usize = texts.iter().map(|t| t.chars().count()).sum();
    let narration = pipeline
        .synthesize(&segments(&texts), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(network.calls.load(Ordering::SeqCst), 3);
    assert!(
        narration
            .outcomes
            .iter()
            .all(|o| o.tier() == Some("synthetic"))
    );
    let expected = 0.3 * total_chars as f64;
    assert!((narration.duration_secs() - expected).abs() < 0.01);
    assert_eq!(*narration.track.sample_rate(), RATE);
}

#[tokio::test]
async fn test_non_empty_text_never_yields_empty_audio() {
    let pipeline = AudioSynthesisPipeline::new(AudioConfig::default());
    let narration = pipeline.narrate("兔", &CancellationToken::new()).await.unwrap();
    assert!(narration.duration_secs() > 0.0);
    assert!(narration.track.peak() > 0.0);
}

#[tokio::test]
async fn test_blank_text_is_rejected() {
    let pipeline = AudioSynthesisPipeline::new(AudioConfig::default());
    let err = pipeline.narrate("   ", &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err.kind(), ParableErrorKind::Input(_)));
}

#[tokio::test]
async fn test_segments_merge_in_original_order() {
    let pipeline = AudioSynthesisPipeline::new(AudioConfig::default()).with_tier(Arc::new(IndexedTone));
    let narration = pipeline
        .synthesize(&segments(&["a", "b", "c", "d"]), &CancellationToken::new())
        .await
        .unwrap();

    let indices: Vec<usize> = narration.outcomes.iter().map(SegmentOutcome::index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);

    let samples = narration.track.samples();
    assert_eq!(samples.len(), 400);
    for (i, chunk) in samples.chunks(100).enumerate() {
        let expected = (i + 1) as f32 / 10.0;
        assert!(chunk.iter().all(|s| (s - expected).abs() < 1e-6), "chunk {}", i);
    }
}

#[tokio::test]
async fn test_empty_success_is_final_and_skipped_at_merge() {
    let pipeline = AudioSynthesisPipeline::new(AudioConfig::default()).with_tier(Arc::new(Silent));
    let err = pipeline
        .synthesize(&segments(&["农夫", "兔子"]), &CancellationToken::new())
        .await
        .unwrap_err();

    match err.kind() {
        ParableErrorKind::Audio(e) => {
            assert_eq!(e.kind, AudioErrorKind::NoMergeableSegments(2))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_wav_output_is_resampled_to_pipeline_rate() {
    let one_second_at_44k = PcmTrack::new(vec![0.25; 44_100], 44_100)
        .to_wav_bytes()
        .unwrap();
    let pipeline = AudioSynthesisPipeline::new(AudioConfig::default()).with_tier(Arc::new(Encoded {
        bytes: one_second_at_44k,
        format: "audio/wav",
    }));

    let narration = pipeline
        .synthesize(&segments(&["农夫"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(narration.outcomes[0].tier(), Some("encoded"));
    assert!((narration.duration_secs() - 1.0).abs() < 0.001);
}

#[tokio::test]
async fn test_compressed_output_needs_a_decoder() {
    let mp3 = Encoded {
        bytes: vec![0xFF, 0xFB, 0x90, 0x00, 1, 2, 3],
        format: "audio/mpeg",
    };

    let without = AudioSynthesisPipeline::new(AudioConfig::default()).with_tier(Arc::new(mp3));
    let err = without
        .synthesize(&segments(&["农夫"]), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ParableErrorKind::Audio(_)));

    let with = without.with_decoder(Arc::new(FixedDecoder));
    let narration = with
        .synthesize(&segments(&["农夫"]), &CancellationToken::new())
        .await
        .unwrap();
    assert!((narration.duration_secs() - 0.5).abs() < 0.001);
}

#[tokio::test]
async fn test_tier_timeout_counts_as_failure() {
    let config = AudioConfigBuilder::default()
        .tier_timeout_secs(1u64)
        .build()
        .unwrap();
    let pipeline = AudioSynthesisPipeline::new(config).with_tier(Arc::new(Hanging));

    let narration = pipeline
        .synthesize(&segments(&["兔子"]), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(narration.outcomes[0].tier(), Some("synthetic"));
}

#[tokio::test]
async fn test_cancellation_aborts_synthesis() {
    let pipeline = AudioSynthesisPipeline::new(AudioConfig::default()).with_tier(Arc::new(Hanging));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = pipeline
        .synthesize(&segments(&["兔子"]), &cancel)
        .await
        .unwrap_err();
    match err.kind() {
        ParableErrorKind::Generator(e) => assert_eq!(e.kind, GeneratorErrorKind::Cancelled),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_from_config_orders_tiers() {
    let config = AudioConfigBuilder::default()
        .tts_endpoint(Some("http://localhost:9/tts".to_string()))
        .local_engine(Some(vec!["espeak-ng".to_string(), "--stdout".to_string()]))
        .build()
        .unwrap();

    let pipeline = AudioSynthesisPipeline::from_config(config);
    assert_eq!(
        pipeline.tier_names(),
        vec!["http-tts", "local-tts", "synthetic"]
    );
}
