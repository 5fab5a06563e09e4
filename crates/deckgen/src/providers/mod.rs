//! Speech and image generation backends.
//!
//! The pipeline only sees the [`SpeechSynthesizer`] and [`ImageSynthesizer`]
//! traits. Which implementation backs them is decided once, from
//! [`DeckConfig`], by [`speech_from_config`] and [`image_from_config`].

mod images;
mod speech;

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

use crate::config::{Credentials, DeckConfig, TtsProvider};
use crate::error::{Error, Result, StageError};

pub use self::images::{DEFAULT_IMAGE_SIZE, ImageBuilder, OpenAiImage};
pub use self::speech::{ElevenLabsSpeech, OpenAiSpeech, SpeechBuilder};

/// Default OpenAI API root.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Default ElevenLabs API root.
pub const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Longest error body kept in a [`StageError::Status`].
const MAX_ERROR_BODY: usize = 200;

/// Turns text into spoken audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Backend name for log lines.
    fn name(&self) -> &str;

    /// Synthesize `text`, returning encoded audio (MP3).
    async fn synthesize_speech(&self, text: &str) -> std::result::Result<Vec<u8>, StageError>;
}

/// Turns a prompt into an image.
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    /// Backend name for log lines.
    fn name(&self) -> &str;

    /// Generate an illustration of `prompt`, returning encoded image bytes.
    async fn synthesize_image(&self, prompt: &str) -> std::result::Result<Vec<u8>, StageError>;
}

/// Pick and build the speech backend named in the config.
pub fn speech_from_config(
    config: &DeckConfig,
    credentials: &Credentials,
) -> Result<Box<dyn SpeechSynthesizer>> {
    let timeout = config.request_timeout();
    match config.tts_provider {
        TtsProvider::OpenAi => {
            let key = require(&credentials.openai_api_key, TtsProvider::OpenAi)?;
            Ok(Box::new(
                OpenAiSpeech::builder(key)
                    .voice(config.voice())
                    .timeout(timeout)
                    .build()?,
            ))
        }
        TtsProvider::ElevenLabs => {
            let key = require(&credentials.elevenlabs_api_key, TtsProvider::ElevenLabs)?;
            Ok(Box::new(
                ElevenLabsSpeech::builder(key)
                    .voice(config.voice())
                    .timeout(timeout)
                    .build()?,
            ))
        }
    }
}

/// Build the image backend, or `None` when images are disabled.
pub fn image_from_config(
    config: &DeckConfig,
    credentials: &Credentials,
) -> Result<Option<Box<dyn ImageSynthesizer>>> {
    if !config.generate_images {
        return Ok(None);
    }
    let key = require(&credentials.openai_api_key, TtsProvider::OpenAi)?;
    let backend = OpenAiImage::builder(key)
        .timeout(config.request_timeout())
        .build()?;
    Ok(Some(Box::new(backend)))
}

fn require(key: &Option<String>, provider: TtsProvider) -> Result<&str> {
    key.as_deref()
        .ok_or_else(|| Error::Config(format!("missing {} API key", provider.label())))
}

/// Build the shared HTTP client with a request timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))
}

/// Fail on non-success statuses, keeping a short piece of the body.
pub(crate) async fn ensure_success(response: Response) -> std::result::Result<Response, StageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StageError::Status {
        status: status.as_u16(),
        body: truncate(body.trim(), MAX_ERROR_BODY),
    })
}

/// Read a binary body, treating an empty one as a failure.
pub(crate) async fn read_bytes(response: Response) -> std::result::Result<Vec<u8>, StageError> {
    let bytes = ensure_success(response).await?.bytes().await?;
    if bytes.is_empty() {
        return Err(StageError::EmptyResponse);
    }
    Ok(bytes.to_vec())
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
