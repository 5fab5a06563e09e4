//! Row-by-row deck assembly.
//!
//! For every input row the pipeline runs the audio stage, then (when
//! enabled) the image stage, then appends one [`CardRecord`]. A failed stage
//! only empties that card's reference; it never stops the build.

use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::config::DeckConfig;
use crate::deck::{CardRecord, Deck, MediaAsset};
use crate::error::{Result, StageError};
use crate::providers::{ImageSynthesizer, SpeechSynthesizer};
use crate::rows::VocabRow;
use crate::thumbnail::make_thumbnail;

/// A recoverable problem met while building the deck.
///
/// Row numbers are one-based, as a spreadsheet shows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The row had fewer than two columns and produced no card.
    RowSkipped {
        /// Row number.
        row: usize,
        /// Number of columns found.
        columns: usize,
    },
    /// Speech synthesis failed; the card has no audio.
    AudioFailed {
        /// Row number.
        row: usize,
        /// Text that was being spoken.
        text: String,
        /// Failure description.
        reason: String,
    },
    /// Image generation or thumbnailing failed; the card has no image.
    ImageFailed {
        /// Row number.
        row: usize,
        /// Prompt that was being illustrated.
        prompt: String,
        /// Failure description.
        reason: String,
    },
}

impl Warning {
    /// Row number the warning belongs to.
    pub fn row(&self) -> usize {
        match self {
            Warning::RowSkipped { row, .. }
            | Warning::AudioFailed { row, .. }
            | Warning::ImageFailed { row, .. } => *row,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::RowSkipped { row, .. } => {
                write!(f, "skipping row {}: insufficient columns", row)
            }
            Warning::AudioFailed { row, text, reason } => {
                write!(f, "row {}: no audio for '{}': {}", row, text, reason)
            }
            Warning::ImageFailed {
                row,
                prompt,
                reason,
            } => write!(f, "row {}: no image for '{}': {}", row, prompt, reason),
        }
    }
}

/// The assembled deck plus everything that went wrong along the way.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// The deck, with generated media attached.
    pub deck: Deck,
    /// Skipped rows and failed stages, in row order.
    pub warnings: Vec<Warning>,
}

/// Sequential deck build over a list of raw CSV rows.
pub struct Pipeline {
    config: DeckConfig,
    speech: Box<dyn SpeechSynthesizer>,
    images: Option<Box<dyn ImageSynthesizer>>,
}

impl Pipeline {
    /// Create a pipeline with the given backends.
    ///
    /// The image backend is only called when `config.generate_images` is set.
    /// With images enabled and no backend, cards are built without images.
    pub fn new(
        config: DeckConfig,
        speech: Box<dyn SpeechSynthesizer>,
        images: Option<Box<dyn ImageSynthesizer>>,
    ) -> Self {
        if config.generate_images && images.is_none() {
            warn!("image generation enabled but no image backend configured; cards will have no images");
        }
        Self {
            config,
            speech,
            images,
        }
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &DeckConfig {
        &self.config
    }

    /// Process every row in order and return the deck.
    ///
    /// Only failing to create the media directory is fatal here; row and
    /// stage problems end up in [`BuildOutput::warnings`].
    pub async fn build(&self, rows: &[Vec<String>]) -> Result<BuildOutput> {
        std::fs::create_dir_all(&self.config.output_media_dir)?;

        let mut deck = Deck::from_config(&self.config);
        let mut warnings = Vec::new();

        for (index, fields) in rows.iter().enumerate() {
            let Some(row) = VocabRow::from_fields(index, fields) else {
                let warning = Warning::RowSkipped {
                    row: index + 1,
                    columns: fields.len(),
                };
                warn!(row = index + 1, fields = ?fields, "{}", warning);
                warnings.push(warning);
                continue;
            };

            info!(
                row = index + 1,
                source = %row.source_text,
                target = %row.target_text,
                "processing card"
            );

            let audio_reference = match self.audio_stage(&row).await {
                Ok(asset) => {
                    info!(file = %asset.filename, provider = self.speech.name(), "generated audio");
                    Some(attach(&mut deck, asset))
                }
                Err(e) => {
                    let warning = Warning::AudioFailed {
                        row: index + 1,
                        text: row.target_text.clone(),
                        reason: e.to_string(),
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                    None
                }
            };

            let image_reference = match self.image_stage(&row).await {
                None => None,
                Some(Ok(asset)) => {
                    let provider = self.images.as_deref().map_or("", |i| i.name());
                    info!(file = %asset.filename, provider, "generated image");
                    Some(attach(&mut deck, asset))
                }
                Some(Err(e)) => {
                    let warning = Warning::ImageFailed {
                        row: index + 1,
                        prompt: row.source_text.clone(),
                        reason: e.to_string(),
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                    None
                }
            };

            deck.push(CardRecord {
                source_text: row.source_text,
                target_text: row.target_text,
                audio_reference,
                image_reference,
            });
        }

        Ok(BuildOutput { deck, warnings })
    }

    async fn audio_stage(&self, row: &VocabRow) -> std::result::Result<MediaAsset, StageError> {
        let bytes = self.speech.synthesize_speech(&row.target_text).await?;
        self.store(audio_filename(row), &bytes)
    }

    /// `None` when images are disabled for this run.
    async fn image_stage(
        &self,
        row: &VocabRow,
    ) -> Option<std::result::Result<MediaAsset, StageError>> {
        if !self.config.generate_images {
            return None;
        }
        let images = self.images.as_deref()?;

        let result = async {
            let raw = images.synthesize_image(&row.source_text).await?;
            let thumb = make_thumbnail(&raw, self.config.thumbnail_size)?;
            self.store(image_filename(row), &thumb)
        }
        .await;
        Some(result)
    }

    fn store(&self, filename: String, bytes: &[u8]) -> std::result::Result<MediaAsset, StageError> {
        let path = self.config.output_media_dir.join(&filename);
        write_media(&path, bytes)?;
        Ok(MediaAsset { filename, path })
    }
}

fn attach(deck: &mut Deck, asset: MediaAsset) -> String {
    let filename = asset.filename.clone();
    deck.attach_media(asset);
    filename
}

/// Write a media file, removing whatever was written if the write fails.
fn write_media(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes).inspect_err(|_| {
        let _ = std::fs::remove_file(path);
    })
}

/// Keep only alphanumeric characters (Unicode-aware).
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// `audio_<sanitized source>_<index>.mp3`
pub fn audio_filename(row: &VocabRow) -> String {
    format!("audio_{}_{}.mp3", sanitize(&row.source_text), row.row_index)
}

/// `image_<sanitized source>_<index>.png`
pub fn image_filename(row: &VocabRow) -> String {
    format!("image_{}_{}.png", sanitize(&row.source_text), row.row_index)
}
