//! In-memory PCM tracks and WAV encoding.

use derive_getters::Getters;
use parable_error::{AudioError, AudioErrorKind};
use std::io::Cursor;
use std::path::Path;

/// Mono floating-point PCM in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct PcmTrack {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl PcmTrack {
    /// Wrap mono samples recorded at `sample_rate`.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate: sample_rate.max(1),
        }
    }

    /// An empty track at `sample_rate`.
    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    /// Whether the track holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0, |peak, s| peak.max(s.abs()))
    }

    /// Linearly resample to `target_rate`.
    pub fn resample(self, target_rate: u32) -> Self {
        let target_rate = target_rate.max(1);
        if target_rate == self.sample_rate || self.samples.len() < 2 {
            return Self::new(self.samples, target_rate);
        }

        let ratio = f64::from(self.sample_rate) / f64::from(target_rate);
        let out_len = (self.samples.len() as f64 / ratio).round() as usize;
        let last = self.samples.len() - 1;
        let samples = (0..out_len)
            .map(|i| {
                let pos = i as f64 * ratio;
                let idx = (pos.floor() as usize).min(last);
                let next = (idx + 1).min(last);
                let frac = (pos - idx as f64) as f32;
                self.samples[idx] * (1.0 - frac) + self.samples[next] * frac
            })
            .collect();

        Self::new(samples, target_rate)
    }

    /// Append `other`, resampling it to this track's rate first.
    pub fn append(&mut self, other: PcmTrack) {
        let other = other.resample(self.sample_rate);
        self.samples.extend(other.samples);
    }

    /// Decode a WAV file held in memory, mixing all channels down to mono.
    ///
    /// # Errors
    ///
    /// Returns [`AudioErrorKind::Decode`] for malformed or unsupported WAV data.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, AudioError> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|e| AudioError::new(AudioErrorKind::Decode(e.to_string())))?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| AudioError::new(AudioErrorKind::Decode(e.to_string())))?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| AudioError::new(AudioErrorKind::Decode(e.to_string())))?
            }
        };

        let samples = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        Ok(Self::new(samples, spec.sample_rate))
    }

    /// Encode as 16-bit mono WAV.
    ///
    /// # Errors
    ///
    /// Returns [`AudioErrorKind::Encode`] if the writer fails.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, AudioError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| AudioError::new(AudioErrorKind::Encode(e.to_string())))?;
            for sample in &self.samples {
                let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
                writer
                    .write_sample(value)
                    .map_err(|e| AudioError::new(AudioErrorKind::Encode(e.to_string())))?;
            }
            writer
                .finalize()
                .map_err(|e| AudioError::new(AudioErrorKind::Encode(e.to_string())))?;
        }
        Ok(cursor.into_inner())
    }

    /// Write the track to `path` as 16-bit mono WAV.
    ///
    /// # Errors
    ///
    /// Returns [`AudioErrorKind::Encode`] if encoding or writing fails.
    pub async fn write_wav(&self, path: &Path) -> Result<(), AudioError> {
        let bytes = self.to_wav_bytes()?;
        tokio::fs::write(path, bytes).await.map_err(|e| {
            AudioError::new(AudioErrorKind::Encode(format!("{}: {}", path.display(), e)))
        })
    }
}

/// Whether `bytes` start with a RIFF/WAVE header.
pub fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}
