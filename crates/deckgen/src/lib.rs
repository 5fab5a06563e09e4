//! Build Anki vocabulary decks from a two-column CSV word list.
//!
//! Each row (`source word, translated word`) becomes one card. The translated
//! word is spoken by a text-to-speech backend (OpenAI or ElevenLabs) and,
//! optionally, the source word is illustrated by an image generator and
//! shrunk to a thumbnail. Everything is packaged into a single `.apkg` file.
//!
//! Generation is best-effort per row: a failed audio or image request leaves
//! that card without the media and the build carries on.
//!
//! # Usage
//!
//! ```no_run
//! use deckgen::{Credentials, DeckConfig, DeckGenerator};
//!
//! # async fn example() -> deckgen::Result<()> {
//! let config = DeckConfig {
//!     deck_name: "Italian Vocabulary".to_string(),
//!     generate_images: true,
//!     ..Default::default()
//! };
//! let generator = DeckGenerator::new(config, Credentials::from_env())?;
//! let report = generator.generate("restaurant.csv", "italian.apkg").await?;
//! println!("{} cards, {} warnings", report.cards, report.warnings.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Input Format
//!
//! ```text
//! hello,ciao
//! the cat,il gatto
//! good morning,buongiorno,extra columns are ignored
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod apkg;
pub mod config;
pub mod deck;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod rows;
pub mod thumbnail;

use std::path::{Path, PathBuf};

use tracing::info;

pub use apkg::ApkgWriter;
pub use config::{Credentials, DeckConfig, TtsProvider};
pub use deck::{CardRecord, Deck, MediaAsset, NoteModel};
pub use error::{Error, Result, StageError};
pub use pipeline::{BuildOutput, Pipeline, Warning};
pub use providers::{ImageSynthesizer, SpeechSynthesizer};
pub use rows::VocabRow;

/// Summary of a finished build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Where the archive was written.
    pub output: PathBuf,
    /// Cards in the deck.
    pub cards: usize,
    /// Cards with audio.
    pub audio: usize,
    /// Cards with an image.
    pub images: usize,
    /// Skipped rows and failed stages.
    pub warnings: Vec<Warning>,
}

impl BuildReport {
    fn new(output: &Path, built: BuildOutput) -> Self {
        let cards = built.deck.cards();
        Self {
            output: output.to_path_buf(),
            cards: cards.len(),
            audio: cards.iter().filter(|c| c.audio_reference.is_some()).count(),
            images: cards.iter().filter(|c| c.image_reference.is_some()).count(),
            warnings: built.warnings,
        }
    }
}

/// Reads a CSV, runs the pipeline and writes the archive.
///
/// Configuration and credentials are checked in [`new()`](Self::new), so a
/// missing API key fails before any input is touched.
pub struct DeckGenerator {
    pipeline: Pipeline,
}

impl DeckGenerator {
    /// Validate the configuration and build the configured backends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required API key is missing or a
    /// setting is invalid.
    pub fn new(config: DeckConfig, credentials: Credentials) -> Result<Self> {
        config.validate(&credentials)?;
        let speech = providers::speech_from_config(&config, &credentials)?;
        let images = providers::image_from_config(&config, &credentials)?;
        Ok(Self {
            pipeline: Pipeline::new(config, speech, images),
        })
    }

    /// Use custom backends, e.g. for testing or a self-hosted service.
    pub fn with_backends(
        config: DeckConfig,
        speech: Box<dyn SpeechSynthesizer>,
        images: Option<Box<dyn ImageSynthesizer>>,
    ) -> Self {
        Self {
            pipeline: Pipeline::new(config, speech, images),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &DeckConfig {
        self.pipeline.config()
    }

    /// Build a deck from `input` and write it to `output`.
    ///
    /// # Errors
    ///
    /// - [`Error::InputNotFound`] / [`Error::Input`] if the CSV cannot be read
    /// - a serialization error (see [`Error::is_serialization`]) if the
    ///   archive cannot be written; no file is left at `output`
    ///
    /// Per-row failures are not errors; they are listed in
    /// [`BuildReport::warnings`].
    pub async fn generate(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<BuildReport> {
        let input = input.as_ref();
        let output = output.as_ref();

        let rows = rows::read_rows(input)?;
        info!(input = %input.display(), rows = rows.len(), "read vocabulary");

        let built = self.pipeline.build(&rows).await?;
        ApkgWriter::new(&built.deck).write_to_file(output)?;

        Ok(BuildReport::new(output, built))
    }
}
