//! Build configuration and provider credentials.
//!
//! Every key is optional in the TOML form:
//!
//! ```toml
//! deck_name = "Italian Vocabulary"
//! deck_id = 1234567891
//! output_media_dir = "media"
//! tts_provider = "elevenlabs"
//! voice_id = "CiwzbDpaN3pQXjTgx3ML"
//! generate_images = true
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variable holding the ElevenLabs API key.
pub const ELEVENLABS_API_KEY_VAR: &str = "ELEVENLABS_API_KEY";

/// Speech synthesis backend.
///
/// Names are matched case-insensitively, in TOML as on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TtsProvider {
    /// OpenAI `tts-1`.
    #[default]
    OpenAi,
    /// ElevenLabs `eleven_multilingual_v2`.
    ElevenLabs,
}

impl TtsProvider {
    /// Voice used when none is configured.
    pub fn default_voice(self) -> &'static str {
        match self {
            TtsProvider::OpenAi => "alloy",
            TtsProvider::ElevenLabs => "CiwzbDpaN3pQXjTgx3ML",
        }
    }

    /// Display name for log lines.
    pub fn label(self) -> &'static str {
        match self {
            TtsProvider::OpenAi => "OpenAI",
            TtsProvider::ElevenLabs => "ElevenLabs",
        }
    }
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(TtsProvider::OpenAi),
            "elevenlabs" => Ok(TtsProvider::ElevenLabs),
            other => Err(Error::Config(format!(
                "unsupported TTS provider '{}'; choose 'openai' or 'elevenlabs'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for TtsProvider {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

/// Settings for one deck build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    /// Deck name shown in Anki.
    pub deck_name: String,

    /// Numeric deck identifier.
    pub deck_id: i64,

    /// Numeric note model identifier.
    pub model_id: i64,

    /// Label of the field holding the source word.
    pub source_field: String,

    /// Label of the field holding the translated word.
    pub target_field: String,

    /// Directory generated audio and image files are written to.
    pub output_media_dir: PathBuf,

    /// Speech synthesis backend.
    pub tts_provider: TtsProvider,

    /// Voice for the speech backend (provider default when unset).
    pub voice_id: Option<String>,

    /// Whether to generate an illustration per card.
    pub generate_images: bool,

    /// Edge length in pixels of the square image thumbnail.
    pub thumbnail_size: u32,

    /// Timeout applied to every provider request.
    pub request_timeout_secs: u64,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            deck_name: "Vocabulary Deck".to_string(),
            deck_id: 1_234_567_891,
            model_id: 1_607_392_319,
            source_field: "Word".to_string(),
            target_field: "Translation".to_string(),
            output_media_dir: PathBuf::from("media"),
            tts_provider: TtsProvider::OpenAi,
            voice_id: None,
            generate_images: false,
            thumbnail_size: 128,
            request_timeout_secs: 60,
        }
    }
}

impl DeckConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a config from a TOML string.
    ///
    /// An unknown `tts_provider` is [`Error::Config`], not a TOML error.
    pub fn parse(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        if let Some(name) = table.get("tts_provider").and_then(toml::Value::as_str) {
            name.parse::<TtsProvider>()?;
        }
        Ok(toml::from_str(content)?)
    }

    /// The configured voice, or the provider's default.
    pub fn voice(&self) -> &str {
        self.voice_id
            .as_deref()
            .unwrap_or_else(|| self.tts_provider.default_voice())
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check settings and credentials before any row is processed.
    ///
    /// The OpenAI key is needed for OpenAI speech and for images; the
    /// ElevenLabs key only for ElevenLabs speech.
    pub fn validate(&self, credentials: &Credentials) -> Result<()> {
        if self.deck_name.trim().is_empty() {
            return Err(Error::Config("deck name must not be empty".into()));
        }
        if self.thumbnail_size == 0 {
            return Err(Error::Config("thumbnail size must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request timeout must be positive".into()));
        }

        let needs_openai = self.tts_provider == TtsProvider::OpenAi || self.generate_images;
        if needs_openai && credentials.openai_api_key.is_none() {
            return Err(Error::Config(format!(
                "{} environment variable not set",
                OPENAI_API_KEY_VAR
            )));
        }
        if self.tts_provider == TtsProvider::ElevenLabs && credentials.elevenlabs_api_key.is_none()
        {
            return Err(Error::Config(format!(
                "{} environment variable not set; it is required for ElevenLabs TTS",
                ELEVENLABS_API_KEY_VAR
            )));
        }
        Ok(())
    }
}

/// Provider API keys.
#[derive(Clone, Default)]
pub struct Credentials {
    /// OpenAI API key.
    pub openai_api_key: Option<String>,
    /// ElevenLabs API key.
    pub elevenlabs_api_key: Option<String>,
}

impl Credentials {
    /// Read keys from `OPENAI_API_KEY` and `ELEVENLABS_API_KEY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read keys through an arbitrary lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: read(OPENAI_API_KEY_VAR),
            elevenlabs_api_key: read(ELEVENLABS_API_KEY_VAR),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |k: &Option<String>| k.as_ref().map(|_| "***");
        f.debug_struct("Credentials")
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("elevenlabs_api_key", &mask(&self.elevenlabs_api_key))
            .finish()
    }
}
