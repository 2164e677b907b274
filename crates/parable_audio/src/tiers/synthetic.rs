//! Procedural last-resort narration.

use crate::{PcmTrack, SegmentAudio, SynthesisTier};
use async_trait::async_trait;
use parable_core::Segment;
use parable_error::ParableResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::f64::consts::TAU;

/// Tones played in sequence, each for a quarter of the segment.
pub const TONES_HZ: [f64; 4] = [220.0, 330.0, 440.0, 550.0];
const TONE_AMPLITUDE: f64 = 0.3;
const NOISE_AMPLITUDE: f64 = 0.05;
const DECAY_PER_SEC: f64 = 2.0;
const PEAK: f64 = 0.8;

/// Deterministic tone-and-noise narration stand-in.
///
/// Output length is proportional to the segment's character count, so a
/// story narrated entirely by this tier still paces the video correctly. It
/// never fails and never returns silence for non-empty text.
///
/// # Examples
///
/// ```
/// use parable_audio::{SegmentAudio, SynthesisTier, SyntheticTier};
/// use parable_core::Segment;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let tier = SyntheticTier::new(22_050, 0.3);
/// let SegmentAudio::Pcm(track) = tier.try_apply(&Segment::new(0, "守株待兔")).await.unwrap() else {
///     unreachable!()
/// };
/// assert!((track.duration_secs() - 1.2).abs() < 0.01);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SyntheticTier {
    sample_rate: u32,
    seconds_per_char: f64,
}

impl SyntheticTier {
    /// Tier producing `seconds_per_char` seconds per character at `sample_rate`.
    pub fn new(sample_rate: u32, seconds_per_char: f64) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            seconds_per_char: seconds_per_char.max(0.01),
        }
    }

    /// Render the signal for `text`.
    pub fn render(&self, text: &str) -> PcmTrack {
        let chars = text.chars().count().max(1);
        let duration = chars as f64 * self.seconds_per_char;
        let rate = f64::from(self.sample_rate);
        let len = ((duration * rate) as usize).max(1);
        let quarter = duration / TONES_HZ.len() as f64;

        let mut rng = StdRng::seed_from_u64(noise_seed(text));

        let mut signal: Vec<f64> = (0..len)
            .map(|i| {
                let t = i as f64 / rate;
                let tone = ((t / quarter) as usize).min(TONES_HZ.len() - 1);
                let start = tone as f64 * quarter;
                let envelope = (-(t - start) * DECAY_PER_SEC).exp();
                TONE_AMPLITUDE * envelope * (TAU * TONES_HZ[tone] * t).sin()
                    + NOISE_AMPLITUDE * gaussian(&mut rng)
            })
            .collect();

        let peak = signal.iter().fold(0.0f64, |p, s| p.max(s.abs()));
        if peak > 0.0 {
            let scale = PEAK / peak;
            signal.iter_mut().for_each(|s| *s *= scale);
        }

        PcmTrack::new(signal.into_iter().map(|s| s as f32).collect(), self.sample_rate)
    }
}

/// Noise seed from the text's SHA-256, stable across builds and platforms.
fn noise_seed(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(prefix)
}

/// Standard normal sample (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.r#gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.r#gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

#[async_trait]
impl SynthesisTier for SyntheticTier {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn try_apply(&self, segment: &Segment) -> ParableResult<SegmentAudio> {
        Ok(SegmentAudio::Pcm(self.render(segment.text())))
    }
}
