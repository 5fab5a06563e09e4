//! In-memory deck model.
//!
//! A [`Deck`] is an append-only list of [`CardRecord`]s plus the note model
//! every card is rendered with, and the [`MediaAsset`]s generated for them.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::config::DeckConfig;

/// Name of the note model every card uses.
pub const MODEL_NAME: &str = "Model with Audio and Small Image";

/// Name of the audio field.
pub const AUDIO_FIELD: &str = "Audio";

/// Name of the image field.
pub const IMAGE_FIELD: &str = "Image";

const CARD_CSS: &str = r#".card {
    font-family: arial;
    font-size: 20px;
    text-align: center;
    color: black;
    background-color: white;
}
img {
    max-width: 128px;
    height: auto;
}"#;

/// One flashcard's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    /// Source word (front).
    pub source_text: String,
    /// Translated word (back).
    pub target_text: String,
    /// Audio filename, set only when speech synthesis succeeded.
    pub audio_reference: Option<String>,
    /// Image filename, set only when image generation is enabled and succeeded.
    pub image_reference: Option<String>,
}

impl CardRecord {
    /// Value of the audio field: `[sound:file]`, or empty.
    pub fn audio_field(&self) -> String {
        self.audio_reference
            .as_deref()
            .map(|f| format!("[sound:{}]", f))
            .unwrap_or_default()
    }

    /// Value of the image field: `<img src="file">`, or empty.
    pub fn image_field(&self) -> String {
        self.image_reference
            .as_deref()
            .map(|f| format!("<img src=\"{}\">", f))
            .unwrap_or_default()
    }

    /// Field values in model order.
    pub fn fields(&self) -> [String; 4] {
        [
            self.source_text.clone(),
            self.target_text.clone(),
            self.audio_field(),
            self.image_field(),
        ]
    }

    /// Media filenames this card references.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.audio_reference
            .as_deref()
            .into_iter()
            .chain(self.image_reference.as_deref())
    }
}

/// A generated media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// Filename as referenced by cards.
    pub filename: String,
    /// Location on disk.
    pub path: PathBuf,
}

/// Note model (fields, template, styling) shared by every card.
#[derive(Debug, Clone)]
pub struct NoteModel {
    /// Model ID.
    pub id: i64,
    /// Model name.
    pub name: String,
    /// Field names in order: source, target, audio, image.
    pub fields: [String; 4],
    /// Template name.
    pub template_name: String,
    /// Question side.
    pub front: String,
    /// Answer side.
    pub back: String,
    /// Card styling.
    pub css: String,
}

impl NoteModel {
    /// Build the model from configured field labels.
    pub fn new(id: i64, source_field: &str, target_field: &str) -> Self {
        let back = format!(
            "{{{{FrontSide}}}}\n<hr id=\"answer\">\n{{{{{target}}}}}<br>\n{{{{{audio}}}}}<br><br>\n<div style=\"max-width: 128px; margin: auto;\">\n    {{{{{image}}}}}\n</div>",
            target = target_field,
            audio = AUDIO_FIELD,
            image = IMAGE_FIELD,
        );
        Self {
            id,
            name: MODEL_NAME.to_string(),
            fields: [
                source_field.to_string(),
                target_field.to_string(),
                AUDIO_FIELD.to_string(),
                IMAGE_FIELD.to_string(),
            ],
            template_name: "Card 1".to_string(),
            front: format!("{{{{{}}}}}", source_field),
            back,
            css: CARD_CSS.to_string(),
        }
    }
}

/// An ordered collection of cards ready to be written out.
#[derive(Debug, Clone)]
pub struct Deck {
    /// Deck name.
    pub name: String,
    /// Deck ID.
    pub id: i64,
    /// Note model for every card.
    pub model: NoteModel,
    cards: Vec<CardRecord>,
    media: Vec<MediaAsset>,
}

impl Deck {
    /// Create an empty deck.
    pub fn new(name: impl Into<String>, id: i64, model: NoteModel) -> Self {
        Self {
            name: name.into(),
            id,
            model,
            cards: Vec::new(),
            media: Vec::new(),
        }
    }

    /// Create an empty deck from a build configuration.
    pub fn from_config(config: &DeckConfig) -> Self {
        let model = NoteModel::new(config.model_id, &config.source_field, &config.target_field);
        Self::new(config.deck_name.clone(), config.deck_id, model)
    }

    /// Append a card.
    pub fn push(&mut self, card: CardRecord) {
        self.cards.push(card);
    }

    /// Record a generated media file.
    pub fn attach_media(&mut self, asset: MediaAsset) {
        self.media.push(asset);
    }

    /// Cards in insertion order.
    pub fn cards(&self) -> &[CardRecord] {
        &self.cards
    }

    /// Every media file attached so far, referenced or not.
    pub fn media(&self) -> &[MediaAsset] {
        &self.media
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the deck has no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Sorted, de-duplicated filenames referenced by at least one card.
    pub fn referenced_media(&self) -> BTreeSet<&str> {
        self.cards.iter().flat_map(CardRecord::references).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(audio: Option<&str>, image: Option<&str>) -> CardRecord {
        CardRecord {
            source_text: "cat".into(),
            target_text: "gatto".into(),
            audio_reference: audio.map(String::from),
            image_reference: image.map(String::from),
        }
    }

    #[test]
    fn test_field_rendering() {
        let c = card(Some("audio_cat_0.mp3"), Some("image_cat_0.png"));
        assert_eq!(c.audio_field(), "[sound:audio_cat_0.mp3]");
        assert_eq!(c.image_field(), "<img src=\"image_cat_0.png\">");

        let empty = card(None, None);
        assert_eq!(empty.fields(), ["cat", "gatto", "", ""].map(String::from));
    }

    #[test]
    fn test_model_templates() {
        let model = NoteModel::new(1, "English", "Italian");
        assert_eq!(model.front, "{{English}}");
        assert!(model.back.starts_with("{{FrontSide}}"));
        assert!(model.back.contains("{{Italian}}<br>"));
        assert!(model.back.contains("{{Audio}}"));
        assert!(model.back.contains("{{Image}}"));
        assert_eq!(model.fields[3], "Image");
    }

    #[test]
    fn test_referenced_media() {
        let mut deck = Deck::new("Test", 1, NoteModel::new(2, "A", "B"));
        deck.push(card(Some("a.mp3"), None));
        deck.push(card(None, Some("b.png")));
        deck.push(card(Some("a.mp3"), None));
        deck.push(card(None, None));

        let refs: Vec<_> = deck.referenced_media().into_iter().collect();
        assert_eq!(refs, vec!["a.mp3", "b.png"]);
        assert_eq!(deck.len(), 4);
    }
}
