//! `show` command
//!
//! Loads a deck file or a built-in deck and prints the normalized
//! configuration as JSON on stdout.

use crate::cli::args::ShowArgs;
use crate::cli::commands::loader_options;
use crate::config::loader::ConfigLoader;
use crate::decks::{find_deck, suggest_deck};
use crate::error::PicConfError;

/// Load a deck and print its normalized configuration.
///
/// # Errors
///
/// Returns an error if the deck cannot be found, read or validated.
pub fn run(args: &ShowArgs) -> Result<(), PicConfError> {
    let loader = ConfigLoader::new(loader_options(args.rank));

    let result = match (&args.file, &args.deck) {
        (Some(path), _) => {
            tracing::info!(file = %path.display(), "loading deck");
            loader.load(path)?
        }
        (None, Some(name)) => {
            let deck = find_deck(name).ok_or_else(|| {
                let hint = suggest_deck(name)
                    .map(|s| format!(" (did you mean '{s}'?)"))
                    .unwrap_or_default();
                PicConfError::Usage(format!("unknown built-in deck '{name}'{hint}"))
            })?;
            tracing::info!(deck = deck.name, "loading built-in deck");
            loader.with_origin(deck.name).load_from_str(deck.yaml)?
        }
        (None, None) => {
            return Err(PicConfError::Usage(
                "a deck file or --deck is required".to_string(),
            ));
        }
    };

    for warning in &result.warnings {
        tracing::warn!("{warning}");
    }

    println!("{}", serde_json::to_string_pretty(&*result.config)?);
    Ok(())
}
