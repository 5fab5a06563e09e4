//! Image generation backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ImageSynthesizer, OPENAI_BASE_URL, ensure_success, http_client, read_bytes};
use crate::error::{Result, StageError};

/// Size requested from the generator, before thumbnailing.
pub const DEFAULT_IMAGE_SIZE: &str = "256x256";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const IMAGE_MODEL: &str = "dall-e-2";
const PROMPT_STYLE: &str = "simple illustration, clean, minimal, white background";

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: String,
    n: u8,
    size: &'a str,
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

/// OpenAI `/v1/images/generations` backend.
///
/// Generation returns a URL; the image itself is fetched with a second,
/// unauthenticated GET.
#[derive(Debug, Clone)]
pub struct OpenAiImage {
    http: Client,
    base_url: String,
    api_key: String,
    size: String,
}

impl OpenAiImage {
    /// Start configuring a backend with the given API key.
    pub fn builder(api_key: impl Into<String>) -> ImageBuilder {
        ImageBuilder {
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            size: DEFAULT_IMAGE_SIZE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    async fn generate_url(&self, prompt: &str) -> std::result::Result<String, StageError> {
        let url = format!("{}/v1/images/generations", self.base_url);
        debug!(url = %url, size = %self.size, "requesting image generation");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&GenerationRequest {
                model: IMAGE_MODEL,
                prompt: styled_prompt(prompt),
                n: 1,
                size: &self.size,
            })
            .send()
            .await?;

        let body: GenerationResponse = ensure_success(response).await?.json().await?;
        body.data
            .into_iter()
            .next()
            .and_then(|img| img.url)
            .filter(|u| !u.is_empty())
            .ok_or(StageError::MissingImageUrl)
    }
}

#[async_trait]
impl ImageSynthesizer for OpenAiImage {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn synthesize_image(&self, prompt: &str) -> std::result::Result<Vec<u8>, StageError> {
        let image_url = self.generate_url(prompt).await?;
        debug!(url = %image_url, "downloading generated image");
        let response = self.http.get(&image_url).send().await?;
        read_bytes(response).await
    }
}

/// Builder for [`OpenAiImage`].
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    api_key: String,
    base_url: String,
    size: String,
    timeout: Duration,
}

impl ImageBuilder {
    /// Set the API root. Defaults to `https://api.openai.com`.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the requested size, e.g. `"512x512"`. Defaults to `"256x256"`.
    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    /// Set the timeout for both the generation and the download request.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    /// Build the backend.
    pub fn build(self) -> Result<OpenAiImage> {
        Ok(OpenAiImage {
            http: http_client(self.timeout)?,
            base_url: self.base_url,
            api_key: self.api_key,
            size: self.size,
        })
    }
}

fn styled_prompt(word: &str) -> String {
    format!("{}, {}", word, PROMPT_STYLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styled_prompt() {
        assert_eq!(
            styled_prompt("cat"),
            "cat, simple illustration, clean, minimal, white background"
        );
    }

    #[test]
    fn test_response_without_url() {
        let body: GenerationResponse = serde_json::from_str(r#"{"data":[{"b64_json":"xx"}]}"#).unwrap();
        assert!(body.data[0].url.is_none());

        let body: GenerationResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(body.data.is_empty());
    }
}
