//! HTTP clients for the story and image generators.

use async_trait::async_trait;
use parable_core::{GeneratorConfig, ImageGenerator, StoryGenerator};
use parable_error::{ConfigError, GeneratorError, GeneratorErrorKind, HttpError, ParableResult};
use serde::{Deserialize, Serialize};
use tracing::instrument;

const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_STORY_CHARS: usize = 300;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

/// Subset of an OpenAI-compatible chat completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Candidate completions
    pub choices: Vec<ChatChoice>,
}

/// One completion candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// Assistant message
    pub message: ChatChoiceMessage,
}

/// Assistant message content.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    /// Generated text
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Trimmed text of the first choice.
    ///
    /// # Errors
    ///
    /// Fails when the response has no non-empty content.
    pub fn into_text(self, generator: &str) -> ParableResult<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| GeneratorError::failed(generator, "response contained no story text").into())
    }
}

fn status_error(generator: &str, endpoint: &str, status: reqwest::StatusCode) -> GeneratorError {
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        GeneratorError::new(GeneratorErrorKind::Unavailable(format!(
            "{} returned {}",
            endpoint, status
        )))
    } else {
        GeneratorError::failed(generator, format!("{} returned {}", endpoint, status))
    }
}

/// Story generator backed by an OpenAI-compatible chat completions API.
#[derive(Debug, Clone)]
pub struct ChatStoryGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_chars: usize,
}

impl ChatStoryGenerator {
    /// Generator posting to `endpoint` with `model`.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            max_chars: DEFAULT_STORY_CHARS,
        }
    }

    /// Send `api_key` as a bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Ask for stories of about `max_chars` characters.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.max(1);
        self
    }

    /// Generator described by the `[generators]` section.
    ///
    /// The API key is read from the environment variable named by
    /// `api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `story_endpoint` is unset or the
    /// named key variable is missing.
    pub fn from_config(config: &GeneratorConfig) -> ParableResult<Self> {
        let endpoint = config
            .story_endpoint
            .clone()
            .ok_or_else(|| ConfigError::missing("generators.story_endpoint"))?;
        let model = config
            .story_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let mut generator = Self::new(endpoint, model)
            .with_max_chars(config.max_story_chars.unwrap_or(DEFAULT_STORY_CHARS));
        if let Some(var) = &config.api_key_env {
            let key = std::env::var(var).map_err(|_| {
                ConfigError::new(format!("environment variable {} is not set", var))
            })?;
            generator = generator.with_api_key(key);
        }
        Ok(generator)
    }

    /// User prompt sent for `idiom`.
    pub fn prompt(&self, idiom: &str) -> String {
        format!(
            "请为成语「{idiom}」写一个适合儿童阅读的小故事，约{}字。\
             故事要有清晰的开头、经过和结尾，语言生动，最后点明成语的含义。\
             只输出故事正文，不要标题。",
            self.max_chars
        )
    }
}

#[async_trait]
impl StoryGenerator for ChatStoryGenerator {
    #[instrument(skip(self), fields(endpoint = %self.endpoint, model = %self.model))]
    async fn generate(&self, idiom: &str) -> ParableResult<String> {
        let prompt = self.prompt(idiom);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "你是一位擅长讲成语故事的儿童作家。",
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.7,
            max_tokens: 1000,
        };

        let mut req = self.client.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req
            .send()
            .await
            .map_err(|e| HttpError::new(format!("{}: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = %status, "Story generator returned error");
            return Err(status_error(self.name(), &self.endpoint, status).into());
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::failed(self.name(), format!("invalid response: {}", e)))?;
        let story = body.into_text(self.name())?;
        tracing::debug!(chars = story.chars().count(), "Story generated");
        Ok(story)
    }

    fn name(&self) -> &str {
        "chat-story"
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    width: u32,
    height: u32,
}

/// Image generator that posts a prompt and receives encoded image bytes.
#[derive(Debug, Clone)]
pub struct HttpImageGenerator {
    client: reqwest::Client,
    endpoint: String,
    width: u32,
    height: u32,
}

impl HttpImageGenerator {
    /// Generator posting to `endpoint`, requesting `width`×`height` images.
    pub fn new(endpoint: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            width,
            height,
        }
    }

    /// Generator described by the `[generators]` section.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `image_endpoint` is unset.
    pub fn from_config(config: &GeneratorConfig, width: u32, height: u32) -> ParableResult<Self> {
        let endpoint = config
            .image_endpoint
            .clone()
            .ok_or_else(|| ConfigError::missing("generators.image_endpoint"))?;
        Ok(Self::new(endpoint, width, height))
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    #[instrument(skip(self, prompt), fields(endpoint = %self.endpoint, chars = prompt.chars().count()))]
    async fn generate(&self, prompt: &str) -> ParableResult<Vec<u8>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ImageRequest {
                prompt,
                width: self.width,
                height: self.height,
            })
            .send()
            .await
            .map_err(|e| HttpError::new(format!("{}: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(self.name(), &self.endpoint, status).into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| HttpError::new(format!("reading body: {}", e)))?;
        if bytes.is_empty() {
            return Err(GeneratorError::failed(self.name(), "empty image body").into());
        }
        tracing::debug!(size = bytes.len(), "Image generated");
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "http-image"
    }
}
