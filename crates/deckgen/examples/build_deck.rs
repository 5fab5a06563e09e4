//! Example: Build an Italian vocabulary deck from an inline word list
//!
//! This example demonstrates how to use deckgen to:
//! 1. Write a small CSV word list
//! 2. Generate audio for every word with OpenAI TTS
//! 3. Package the result as an .apkg file
//!
//! Requires OPENAI_API_KEY in the environment.
//!
//! Run with: cargo run -p deckgen --example build_deck

use deckgen::{Credentials, DeckConfig, DeckGenerator};

const WORDS: &str = "\
the menu,il menù
the bill,il conto
water,l'acqua
a table for two,un tavolo per due
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let work_dir = std::env::temp_dir().join("deckgen-example");
    std::fs::create_dir_all(&work_dir)?;

    let csv_path = work_dir.join("restaurant.csv");
    std::fs::write(&csv_path, WORDS)?;

    let config = DeckConfig {
        deck_name: "Italian::Restaurant".to_string(),
        source_field: "English".to_string(),
        target_field: "Italian".to_string(),
        output_media_dir: work_dir.join("media"),
        ..Default::default()
    };

    let generator = DeckGenerator::new(config, Credentials::from_env())?;
    let output = work_dir.join("restaurant.apkg");
    let report = generator.generate(&csv_path, &output).await?;

    println!("Created {}", report.output.display());
    println!("  cards:  {}", report.cards);
    println!("  audio:  {}", report.audio);
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }

    Ok(())
}
