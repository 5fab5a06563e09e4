//! Build an Anki vocabulary deck from a CSV word list.
//!
//! ```text
//! OPENAI_API_KEY=sk-... deckgen --input restaurant.csv --output italian.apkg --images -v
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use deckgen::{Credentials, DeckConfig, DeckGenerator, TtsProvider};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI Arguments
// ============================================================================

/// Build an Anki deck with spoken audio and optional images from a CSV word list.
#[derive(Parser, Debug)]
#[command(name = "deckgen")]
#[command(version, about, long_about = None)]
struct Args {
    /// CSV file with rows of `source word,translated word`
    #[arg(short, long)]
    input: PathBuf,

    /// Path of the .apkg file to write
    #[arg(short, long)]
    output: PathBuf,

    /// TOML file with deck settings (flags below override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Deck name shown in Anki
    #[arg(long)]
    deck_name: Option<String>,

    /// Numeric deck ID
    #[arg(long)]
    deck_id: Option<i64>,

    /// Directory for generated audio and image files
    #[arg(long)]
    media_dir: Option<PathBuf>,

    /// Text-to-speech provider: openai or elevenlabs
    #[arg(long)]
    tts: Option<TtsProvider>,

    /// Voice name (OpenAI) or voice ID (ElevenLabs)
    #[arg(long)]
    voice: Option<String>,

    /// Generate an illustration for each card
    #[arg(long, default_value_t = false)]
    images: bool,

    /// Thumbnail edge length in pixels
    #[arg(long)]
    thumbnail_size: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Start from the config file (or defaults) and apply flag overrides.
    fn deck_config(&self) -> deckgen::Result<DeckConfig> {
        let mut config = match &self.config {
            Some(path) => DeckConfig::from_file(path)?,
            None => DeckConfig::default(),
        };

        if let Some(name) = &self.deck_name {
            config.deck_name = name.clone();
        }
        if let Some(id) = self.deck_id {
            config.deck_id = id;
        }
        if let Some(dir) = &self.media_dir {
            config.output_media_dir = dir.clone();
        }
        if let Some(provider) = self.tts {
            config.tts_provider = provider;
        }
        if let Some(voice) = &self.voice {
            config.voice_id = Some(voice.clone());
        }
        if self.images {
            config.generate_images = true;
        }
        if let Some(size) = self.thumbnail_size {
            config.thumbnail_size = size;
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_secs = secs;
        }
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: &Args) -> deckgen::Result<()> {
    let config = args.deck_config()?;
    info!(
        deck = %config.deck_name,
        tts = config.tts_provider.label(),
        images = config.generate_images,
        media_dir = %config.output_media_dir.display(),
        "Starting deck build"
    );

    let generator = DeckGenerator::new(config, Credentials::from_env())?;
    let report = generator.generate(&args.input, &args.output).await?;

    for warning in &report.warnings {
        warn!("{}", warning);
    }
    println!(
        "Deck created: {} ({} cards, {} with audio, {} with images, {} warnings)",
        report.output.display(),
        report.cards,
        report.audio,
        report.images,
        report.warnings.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_serialization() {
                error!(output = %args.output.display(), "failed to write deck archive");
            }
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_flag_overrides() {
        let args = Args::parse_from([
            "deckgen",
            "--input",
            "words.csv",
            "--output",
            "deck.apkg",
            "--tts",
            "ElevenLabs",
            "--voice",
            "Bella",
            "--images",
            "--deck-id",
            "42",
        ]);
        let config = args.deck_config().unwrap();
        assert_eq!(config.tts_provider, TtsProvider::ElevenLabs);
        assert_eq!(config.voice(), "Bella");
        assert!(config.generate_images);
        assert_eq!(config.deck_id, 42);
        assert_eq!(config.deck_name, DeckConfig::default().deck_name);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let result = Args::try_parse_from([
            "deckgen", "--input", "a.csv", "--output", "b.apkg", "--tts", "polly",
        ]);
        assert!(result.is_err());
    }
}
