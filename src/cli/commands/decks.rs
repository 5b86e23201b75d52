//! `decks` command
//!
//! Lists the built-in benchmark decks and prints their YAML source.

use crate::cli::args::{DecksListArgs, DecksPrintArgs, OutputFormat};
use crate::decks::{find_deck, list_decks, suggest_deck};
use crate::error::PicConfError;

/// List the built-in decks.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn list(args: &DecksListArgs) -> Result<(), PicConfError> {
    let decks = list_decks(args.geometry);

    match args.format {
        OutputFormat::Human => {
            let width = decks.iter().map(|d| d.name.len()).max().unwrap_or(0);
            for deck in &decks {
                println!(
                    "{:<width$}  {:<13}  {}",
                    deck.name,
                    deck.geometry.name(),
                    deck.description
                );
            }
        }
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = decks
                .iter()
                .map(|d| {
                    serde_json::json!({
                        "name": d.name,
                        "geometry": d.geometry,
                        "description": d.description,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(())
}

/// Print a built-in deck's YAML source.
///
/// # Errors
///
/// Returns a usage error if no deck has that name.
pub fn print(args: &DecksPrintArgs) -> Result<(), PicConfError> {
    let Some(deck) = find_deck(&args.name) else {
        let hint = suggest_deck(&args.name)
            .map(|s| format!(" (did you mean '{s}'?)"))
            .unwrap_or_default();
        return Err(PicConfError::Usage(format!(
            "unknown built-in deck '{}'{hint}",
            args.name
        )));
    };
    print!("{}", deck.yaml);
    Ok(())
}
