//! .apkg archive writing.
//!
//! An `.apkg` is a ZIP holding `collection.anki2` (a SQLite database), a
//! `media` JSON manifest mapping numeric entry names to filenames, and the
//! media files themselves stored under those numeric names.

mod collection;

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::deck::{CardRecord, Deck, MediaAsset};
use crate::error::{Error, Result};

use self::collection::FIELD_SEPARATOR;

/// Writes a [`Deck`] and its media to an `.apkg` file.
///
/// Only media referenced by at least one card is packaged. The archive is
/// assembled in a temporary file next to the destination and renamed into
/// place once complete.
///
/// # Example
///
/// ```no_run
/// use deckgen::{ApkgWriter, Deck, DeckConfig};
///
/// # fn main() -> deckgen::Result<()> {
/// let deck = Deck::from_config(&DeckConfig::default());
/// ApkgWriter::new(&deck).write_to_file("vocabulary.apkg")?;
/// # Ok(())
/// # }
/// ```
pub struct ApkgWriter<'a> {
    deck: &'a Deck,
    media: &'a [MediaAsset],
}

impl<'a> ApkgWriter<'a> {
    /// Create a writer using the media attached to the deck.
    pub fn new(deck: &'a Deck) -> Self {
        Self {
            deck,
            media: deck.media(),
        }
    }

    /// Use an explicit set of media assets instead of the deck's own.
    pub fn with_media(mut self, media: &'a [MediaAsset]) -> Self {
        self.media = media;
        self
    }

    /// Media that will be packaged, in manifest order.
    ///
    /// Exactly one asset per filename referenced by a card. A referenced
    /// filename with no matching asset is [`Error::MediaNotFound`].
    pub fn manifest(&self) -> Result<Vec<&'a MediaAsset>> {
        self.deck
            .referenced_media()
            .into_iter()
            .map(|name| {
                self.media
                    .iter()
                    .find(|asset| asset.filename == name)
                    .ok_or_else(|| Error::MediaNotFound(name.to_string()))
            })
            .collect()
    }

    /// Build the archive and write it to `path`.
    ///
    /// Nothing is left at `path` if any step fails.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let manifest = self.manifest()?;

        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("collection.anki2");
        {
            let conn = Connection::open(&db_path)?;
            self.create_database(&conn)?;
        }

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(parent)?;
        {
            let mut zip = ZipWriter::new(staged.as_file_mut());
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

            zip.start_file("collection.anki2", options)?;
            zip.write_all(&std::fs::read(&db_path)?)?;

            let names: HashMap<String, &str> = manifest
                .iter()
                .enumerate()
                .map(|(i, asset)| (i.to_string(), asset.filename.as_str()))
                .collect();
            zip.start_file("media", options)?;
            zip.write_all(serde_json::to_string(&names)?.as_bytes())?;

            for (index, asset) in manifest.iter().enumerate() {
                let content = std::fs::read(&asset.path)
                    .map_err(|_| Error::MediaNotFound(asset.path.display().to_string()))?;
                zip.start_file(index.to_string(), options)?;
                zip.write_all(&content)?;
                debug!(entry = index, file = %asset.filename, "packaged media");
            }

            zip.finish()?;
        }
        staged.persist(path).map_err(|e| Error::Io(e.error))?;

        info!(
            path = %path.display(),
            cards = self.deck.len(),
            media = manifest.len(),
            "wrote deck archive"
        );
        Ok(())
    }

    fn create_database(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(collection::SCHEMA)?;

        let now = current_timestamp();
        let now_ms = now * 1000;
        let model = &self.deck.model;

        conn.execute(
            "INSERT INTO col (id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags)
             VALUES (1, ?1, ?2, ?2, 11, 0, 0, 0, ?3, ?4, ?5, ?6, '{}')",
            rusqlite::params![
                now,
                now_ms,
                collection::collection_conf(self.deck.id, model.id).to_string(),
                collection::models(model, self.deck.id, now).to_string(),
                collection::decks(self.deck, now).to_string(),
                collection::deck_options().to_string(),
            ],
        )?;

        let mut insert_note = conn.prepare(
            "INSERT INTO notes (id, guid, mid, mod, usn, tags, flds, sfld, csum, flags, data)
             VALUES (?1, ?2, ?3, ?4, -1, '', ?5, ?6, ?7, 0, '')",
        )?;
        let mut insert_card = conn.prepare(
            "INSERT INTO cards (id, nid, did, ord, mod, usn, type, queue, due, ivl, factor, reps, lapses, left, odue, odid, flags, data)
             VALUES (?1, ?2, ?3, 0, ?4, -1, 0, 0, ?5, 0, 0, 0, 0, 0, 0, 0, 0, '')",
        )?;

        for (position, card) in self.deck.cards().iter().enumerate() {
            let id = now_ms + position as i64;
            let fields = card.fields();
            let sort_field = &fields[0];

            insert_note.execute(rusqlite::params![
                id,
                note_guid(card, position),
                model.id,
                now,
                fields.join(FIELD_SEPARATOR),
                sort_field,
                checksum(sort_field),
            ])?;
            // new cards are shown in file order
            insert_card.execute(rusqlite::params![id, id, self.deck.id, now, position as i64 + 1])?;
        }

        Ok(())
    }
}

/// Current Unix timestamp in seconds.
fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// GUID derived from the card's fields and its position in the deck,
/// base91 encoded.
///
/// Rebuilding the same input yields the same GUIDs, so re-importing updates
/// notes in place. Identical rows still get distinct GUIDs.
fn note_guid(card: &CardRecord, position: usize) -> String {
    const CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+,-./:;<=>?@[]^_`{|}~";

    let mut hasher = Sha256::new();
    hasher.update(card.fields().join(FIELD_SEPARATOR));
    hasher.update(FIELD_SEPARATOR);
    hasher.update((position as u64).to_be_bytes());
    let mut n = leading_u64(&hasher.finalize());

    let mut guid = String::new();
    loop {
        guid.push(CHARS[(n % 91) as usize] as char);
        n /= 91;
        if n == 0 {
            break;
        }
    }
    guid
}

/// Sort field checksum: first 32 bits of the digest of the text with tags
/// removed.
fn checksum(sort_field: &str) -> i64 {
    let digest = Sha256::digest(strip_html(sort_field));
    (leading_u64(&digest) >> 32) as i64
}

fn leading_u64(digest: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn strip_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::NoteModel;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn card(source: &str, audio: Option<&str>) -> CardRecord {
        CardRecord {
            source_text: source.into(),
            target_text: "x".into(),
            audio_reference: audio.map(String::from),
            image_reference: None,
        }
    }

    #[test]
    fn test_note_guid_stable() {
        let a = card("cat", None);
        assert_eq!(note_guid(&a, 0), note_guid(&a.clone(), 0));
        assert_ne!(note_guid(&a, 0), note_guid(&card("dog", None), 0));
        assert!(!note_guid(&a, 0).is_empty());
    }

    #[test]
    fn test_note_guid_distinct_for_identical_rows() {
        let a = card("cat", None);
        assert_ne!(note_guid(&a, 0), note_guid(&a, 2));
    }

    #[test]
    fn test_checksum_ignores_tags() {
        let sum = checksum("<b>cane</b> nero");
        assert_eq!(sum, checksum("cane nero"));
        assert!((0..=u32::MAX as i64).contains(&sum));
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<b>cane</b> nero"), "cane nero");
        assert_eq!(strip_html("plain"), "plain");
    }

    #[test]
    fn test_manifest_filters_orphans() {
        let mut deck = Deck::new("T", 1, NoteModel::new(2, "A", "B"));
        deck.push(card("cat", Some("audio_cat_0.mp3")));
        let assets = vec![
            MediaAsset {
                filename: "audio_cat_0.mp3".into(),
                path: PathBuf::from("media/audio_cat_0.mp3"),
            },
            MediaAsset {
                filename: "orphan.png".into(),
                path: PathBuf::from("media/orphan.png"),
            },
        ];
        let writer = ApkgWriter::new(&deck).with_media(&assets);
        let manifest = writer.manifest().unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].filename, "audio_cat_0.mp3");
    }

    #[test]
    fn test_missing_asset_leaves_no_file() {
        let mut deck = Deck::new("T", 1, NoteModel::new(2, "A", "B"));
        deck.push(card("cat", Some("audio_cat_0.mp3")));

        let dir = tempdir().unwrap();
        let out = dir.path().join("deck.apkg");
        let result = ApkgWriter::new(&deck).write_to_file(&out);
        assert!(matches!(result, Err(Error::MediaNotFound(_))));
        assert!(!out.exists());
    }
}
