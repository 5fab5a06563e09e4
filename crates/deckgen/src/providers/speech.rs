//! Speech synthesis backends.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{ELEVENLABS_BASE_URL, OPENAI_BASE_URL, SpeechSynthesizer, http_client, read_bytes};
use crate::config::TtsProvider;
use crate::error::{Result, StageError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const OPENAI_TTS_MODEL: &str = "tts-1";
const ELEVENLABS_MODEL: &str = "eleven_multilingual_v2";
const ELEVENLABS_OUTPUT_FORMAT: &str = "mp3_44100_128";

#[derive(Serialize)]
struct OpenAiSpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

#[derive(Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// Connection settings shared by both speech backends.
#[derive(Debug, Clone)]
struct Endpoint {
    http: Client,
    base_url: String,
    api_key: String,
    voice: String,
}

/// OpenAI `/v1/audio/speech` backend.
///
/// # Example
///
/// ```no_run
/// use deckgen::providers::{OpenAiSpeech, SpeechSynthesizer};
///
/// # async fn example() -> deckgen::Result<()> {
/// let tts = OpenAiSpeech::builder("sk-...").voice("nova").build()?;
/// let mp3 = tts.synthesize_speech("buongiorno").await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OpenAiSpeech(Endpoint);

impl OpenAiSpeech {
    /// Start configuring a backend with the given API key.
    pub fn builder(api_key: impl Into<String>) -> SpeechBuilder<Self> {
        SpeechBuilder::new(TtsProvider::OpenAi, api_key, OPENAI_BASE_URL)
    }

    /// Voice this backend speaks with.
    pub fn voice(&self) -> &str {
        &self.0.voice
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    fn name(&self) -> &str {
        TtsProvider::OpenAi.label()
    }

    async fn synthesize_speech(&self, text: &str) -> std::result::Result<Vec<u8>, StageError> {
        let ep = &self.0;
        let url = format!("{}/v1/audio/speech", ep.base_url);
        debug!(url = %url, voice = %ep.voice, "requesting OpenAI speech");

        let response = ep
            .http
            .post(&url)
            .bearer_auth(&ep.api_key)
            .json(&OpenAiSpeechRequest {
                model: OPENAI_TTS_MODEL,
                voice: &ep.voice,
                input: text,
                response_format: "mp3",
            })
            .send()
            .await?;
        read_bytes(response).await
    }
}

/// ElevenLabs `/v1/text-to-speech/{voice}` backend.
#[derive(Debug, Clone)]
pub struct ElevenLabsSpeech(Endpoint);

impl ElevenLabsSpeech {
    /// Start configuring a backend with the given API key.
    pub fn builder(api_key: impl Into<String>) -> SpeechBuilder<Self> {
        SpeechBuilder::new(TtsProvider::ElevenLabs, api_key, ELEVENLABS_BASE_URL)
    }

    /// Voice ID this backend speaks with.
    pub fn voice(&self) -> &str {
        &self.0.voice
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSpeech {
    fn name(&self) -> &str {
        TtsProvider::ElevenLabs.label()
    }

    async fn synthesize_speech(&self, text: &str) -> std::result::Result<Vec<u8>, StageError> {
        let ep = &self.0;
        let url = format!("{}/v1/text-to-speech/{}", ep.base_url, ep.voice);
        debug!(url = %url, "requesting ElevenLabs speech");

        let response = ep
            .http
            .post(&url)
            .header("xi-api-key", &ep.api_key)
            .query(&[("output_format", ELEVENLABS_OUTPUT_FORMAT)])
            .json(&ElevenLabsRequest {
                text,
                model_id: ELEVENLABS_MODEL,
            })
            .send()
            .await?;
        read_bytes(response).await
    }
}

/// Builder for a speech backend.
///
/// Obtained from [`OpenAiSpeech::builder`] or [`ElevenLabsSpeech::builder`].
#[derive(Debug, Clone)]
pub struct SpeechBuilder<T> {
    provider: TtsProvider,
    api_key: String,
    base_url: String,
    voice: Option<String>,
    timeout: Duration,
    _backend: PhantomData<T>,
}

impl<T> SpeechBuilder<T> {
    fn new(provider: TtsProvider, api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            base_url: base_url.to_string(),
            voice: None,
            timeout: DEFAULT_TIMEOUT,
            _backend: PhantomData,
        }
    }

    /// Set the API root. Defaults to the provider's public endpoint.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the voice. Defaults to the provider's default voice.
    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Set the request timeout. Defaults to 60 seconds.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    fn endpoint(self) -> Result<Endpoint> {
        let voice = self
            .voice
            .unwrap_or_else(|| self.provider.default_voice().to_string());
        Ok(Endpoint {
            http: http_client(self.timeout)?,
            base_url: self.base_url,
            api_key: self.api_key,
            voice,
        })
    }
}

impl SpeechBuilder<OpenAiSpeech> {
    /// Build the backend.
    pub fn build(self) -> Result<OpenAiSpeech> {
        Ok(OpenAiSpeech(self.endpoint()?))
    }
}

impl SpeechBuilder<ElevenLabsSpeech> {
    /// Build the backend.
    pub fn build(self) -> Result<ElevenLabsSpeech> {
        Ok(ElevenLabsSpeech(self.endpoint()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_voices() {
        let openai = OpenAiSpeech::builder("k").build().unwrap();
        assert_eq!(openai.voice(), "alloy");

        let eleven = ElevenLabsSpeech::builder("k").build().unwrap();
        assert_eq!(eleven.voice(), "CiwzbDpaN3pQXjTgx3ML");
    }

    #[test]
    fn test_url_trailing_slash() {
        let tts = OpenAiSpeech::builder("k")
            .url("http://localhost:9000/")
            .build()
            .unwrap();
        assert_eq!(tts.0.base_url, "http://localhost:9000");
    }
}
