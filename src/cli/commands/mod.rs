//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod decks;
pub mod show;
pub mod validate;
pub mod version;

use crate::cli::args::{Cli, Commands, DecksListArgs, DecksSubcommand};
use crate::config::loader::LoaderOptions;
use crate::error::PicConfError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub fn dispatch(cli: Cli) -> Result<(), PicConfError> {
    match cli.command {
        Commands::Validate(args) => validate::run(&args),
        Commands::Show(args) => show::run(&args),
        Commands::Decks(cmd) => match cmd.subcommand {
            None => decks::list(&DecksListArgs::default()),
            Some(DecksSubcommand::List(args)) => decks::list(&args),
            Some(DecksSubcommand::Print(args)) => decks::print(&args),
        },
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}

/// Loader options with an optional `--rank` override.
fn loader_options(rank: Option<u32>) -> LoaderOptions {
    let defaults = LoaderOptions::default();
    LoaderOptions {
        rank: rank.unwrap_or(defaults.rank),
        ..defaults
    }
}
