//! CLI argument definitions
//!
//! All Clap derive structs for `picconf` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::schema::Geometry;

// ============================================================================
// Root CLI
// ============================================================================

/// Parameter deck loader and validator for particle-in-cell simulations.
#[derive(Parser, Debug)]
#[command(name = "picconf", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "PICCONF_COLOR")]
    pub color: ColorChoice,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate deck files.
    Validate(ValidateArgs),

    /// Print the normalized configuration of a deck as JSON.
    Show(ShowArgs),

    /// Work with the built-in benchmark decks.
    Decks(DecksCommand),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Deck Commands
// ============================================================================

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Deck files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,

    /// Process rank visible to expressions as `rank`.
    #[arg(long, env = "PICCONF_RANK")]
    pub rank: Option<u32>,
}

/// Arguments for `show`.
#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("source").required(true).multiple(false))]
pub struct ShowArgs {
    /// Deck file to load.
    #[arg(group = "source")]
    pub file: Option<PathBuf>,

    /// Built-in deck to load instead of a file.
    #[arg(long, group = "source")]
    pub deck: Option<String>,

    /// Process rank visible to expressions as `rank`.
    #[arg(long, env = "PICCONF_RANK")]
    pub rank: Option<u32>,
}

/// Built-in deck commands.
#[derive(Args, Debug)]
pub struct DecksCommand {
    /// Deck subcommand, `list` when omitted.
    #[command(subcommand)]
    pub subcommand: Option<DecksSubcommand>,
}

/// Built-in deck subcommands.
#[derive(Subcommand, Debug)]
pub enum DecksSubcommand {
    /// List the built-in decks.
    List(DecksListArgs),

    /// Print the YAML source of a built-in deck.
    Print(DecksPrintArgs),
}

/// Arguments for `decks list`.
#[derive(Args, Debug, Default)]
pub struct DecksListArgs {
    /// Only list decks in this geometry.
    #[arg(long)]
    pub geometry: Option<Geometry>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `decks print`.
#[derive(Args, Debug)]
pub struct DecksPrintArgs {
    /// Deck name.
    pub name: String,
}

// ============================================================================
// Version
// ============================================================================

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

// ============================================================================
// Tests
// ============================================================================
