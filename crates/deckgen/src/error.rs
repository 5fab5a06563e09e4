//! Error types for deckgen.
//!
//! Errors fall into two groups:
//!
//! 1. [`Error`]: fatal for the whole build. Bad configuration, an unreadable
//!    input file, or a failed archive write.
//! 2. [`StageError`]: a single audio or image step failed for a single row.
//!    The pipeline catches these, records a warning and carries on.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for deckgen operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a deck build.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing credentials, unknown provider or an invalid setting.
    #[error("configuration error: {0}")]
    Config(String),

    /// TOML parsing error in a config file.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The input CSV file does not exist.
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The input CSV file could not be read or decoded.
    #[error("input file unreadable: {0}")]
    Input(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A card references a media file that has no asset on disk.
    #[error("media file not found: {0}")]
    MediaNotFound(String),

    /// SQLite error while building the collection database.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// ZIP error while writing the archive.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON error while encoding collection metadata.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error came from writing the output archive.
    pub fn is_serialization(&self) -> bool {
        matches!(
            self,
            Error::MediaNotFound(_) | Error::Sqlite(_) | Error::Zip(_) | Error::Json(_)
        )
    }
}

/// A failed generation or post-processing step for one row.
#[derive(Debug, Error)]
pub enum StageError {
    /// Transport failure, including timeouts.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The provider answered successfully but sent no content.
    #[error("provider returned an empty response")]
    EmptyResponse,

    /// The image generation response carried no result URL.
    #[error("image response contained no URL")]
    MissingImageUrl,

    /// Decoding, resizing or encoding the image failed.
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    /// Writing the media file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_classification() {
        assert!(Error::MediaNotFound("a.mp3".into()).is_serialization());
        assert!(!Error::Config("no key".into()).is_serialization());
        assert!(!Error::InputNotFound(PathBuf::from("x.csv")).is_serialization());
    }

    #[test]
    fn test_status_message() {
        let err = StageError::Status {
            status: 401,
            body: "bad key".into(),
        };
        assert_eq!(err.to_string(), "provider returned 401: bad key");
    }
}
