//! Networked text-to-speech.

use crate::{SegmentAudio, SynthesisTier};
use async_trait::async_trait;
use parable_core::Segment;
use parable_error::{GeneratorError, GeneratorErrorKind, HttpError, ParableResult};
use serde::Serialize;

/// Default voice requested from the speech service.
pub const DEFAULT_VOICE: &str = "zh-CN-XiaoxiaoNeural";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    voice: &'a str,
    language: &'a str,
}

/// Speech from an HTTP endpoint.
///
/// Posts `{"text", "voice", "language"}` as JSON and expects the audio file
/// as the response body. The response `Content-Type` is kept as the format
/// so MP3 responses can be decoded at merge time.
#[derive(Debug, Clone)]
pub struct HttpSpeechTier {
    client: reqwest::Client,
    endpoint: String,
    voice: String,
    language: String,
}

impl HttpSpeechTier {
    /// Tier posting to `endpoint` with the default voice.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            voice: DEFAULT_VOICE.to_string(),
            language: "zh-CN".to_string(),
        }
    }

    /// Use a different voice.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Use a different language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl SynthesisTier for HttpSpeechTier {
    fn name(&self) -> &str {
        "http-tts"
    }

    #[tracing::instrument(skip(self, segment), fields(endpoint = %self.endpoint, index = segment.index(), chars = segment.char_count()))]
    async fn try_apply(&self, segment: &Segment) -> ParableResult<SegmentAudio> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SpeechRequest {
                text: segment.text(),
                voice: &self.voice,
                language: &self.language,
            })
            .send()
            .await
            .map_err(|e| HttpError::new(format!("{}: {}", self.endpoint, e)))?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeneratorError::new(GeneratorErrorKind::Unavailable(format!(
                "{} returned {}",
                self.endpoint, status
            )))
            .into());
        }
        if !status.is_success() {
            return Err(GeneratorError::failed(self.name(), format!("status {}", status)).into());
        }

        let format = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| HttpError::new(format!("reading body: {}", e)))?;

        tracing::debug!(size = bytes.len(), format = %format, "Received speech");
        Ok(SegmentAudio::Encoded {
            bytes: bytes.to_vec(),
            format,
        })
    }
}
