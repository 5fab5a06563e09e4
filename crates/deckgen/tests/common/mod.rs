//! Shared test utilities: deterministic stub backends and archive readers.

#![allow(dead_code)] // Not all test files use every helper

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use deckgen::{ImageSynthesizer, SpeechSynthesizer, StageError};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use rusqlite::Connection;
use tempfile::TempDir;
use zip::ZipArchive;

/// Speech stub that returns fixed bytes, failing for chosen texts.
#[derive(Default)]
pub struct StubSpeech {
    fail_on: HashSet<String>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl StubSpeech {
    pub fn failing_on(texts: &[&str]) -> Self {
        Self {
            fail_on: texts.iter().map(|t| t.to_string()).collect(),
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for StubSpeech {
    fn name(&self) -> &str {
        "stub"
    }

    async fn synthesize_speech(&self, text: &str) -> Result<Vec<u8>, StageError> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail_on.contains(text) {
            return Err(StageError::Status {
                status: 500,
                body: "stub failure".into(),
            });
        }
        Ok(format!("MP3:{}", text).into_bytes())
    }
}

/// Image stub returning a small PNG, or undecodable bytes for chosen prompts.
#[derive(Default)]
pub struct StubImages {
    garbage_for: HashSet<String>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl StubImages {
    pub fn garbage_for(prompts: &[&str]) -> Self {
        Self {
            garbage_for: prompts.iter().map(|t| t.to_string()).collect(),
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl ImageSynthesizer for StubImages {
    fn name(&self) -> &str {
        "stub"
    }

    async fn synthesize_image(&self, prompt: &str) -> Result<Vec<u8>, StageError> {
        self.calls.lock().unwrap().push(prompt.to_string());
        if self.garbage_for.contains(prompt) {
            return Ok(b"not a png".to_vec());
        }
        Ok(sample_png(64, 48))
    }
}

/// Encode a solid RGBA image as PNG.
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([30, 120, 200, 255]));
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

/// Turn string literals into raw CSV rows.
pub fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data.iter()
        .map(|r| r.iter().map(|f| f.to_string()).collect())
        .collect()
}

/// Extract `collection.anki2` from an .apkg and open it.
///
/// The returned `TempDir` must outlive the connection.
pub fn open_apkg_database(apkg_path: &Path) -> (Connection, TempDir) {
    let file = std::fs::File::open(apkg_path).unwrap();
    let mut archive = ZipArchive::new(file).unwrap();

    let mut db_file = archive.by_name("collection.anki2").unwrap();
    let mut db_bytes = Vec::new();
    db_file.read_to_end(&mut db_bytes).unwrap();

    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("collection.anki2");
    std::fs::write(&db_path, &db_bytes).unwrap();

    (Connection::open(&db_path).unwrap(), temp_dir)
}

/// Read the `media` manifest from an .apkg.
pub fn media_manifest(apkg_path: &Path) -> HashMap<String, String> {
    let file = std::fs::File::open(apkg_path).unwrap();
    let mut archive = ZipArchive::new(file).unwrap();

    let mut media = archive.by_name("media").unwrap();
    let mut content = String::new();
    media.read_to_string(&mut content).unwrap();
    serde_json::from_str(&content).unwrap()
}

/// Read one ZIP entry's bytes.
pub fn archive_entry(apkg_path: &Path, name: &str) -> Vec<u8> {
    let file = std::fs::File::open(apkg_path).unwrap();
    let mut archive = ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    bytes
}
