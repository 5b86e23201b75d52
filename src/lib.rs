//! `picconf` - parameter deck loader for particle-in-cell simulations
//!
//! Reads a declarative deck of named blocks (`Main`, `Species`, lasers,
//! diagnostics), evaluates its numeric expressions, validates it and hands
//! out an immutable [`config::SimulationConfig`] for the simulation engine.
//!
//! ```no_run
//! use picconf::config::ConfigLoader;
//!
//! let result = ConfigLoader::with_defaults()
//!     .load(std::path::Path::new("deck.yaml"))
//!     .expect("deck should be valid");
//! for species in result.config.species() {
//!     println!("{}", species.name);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod decks;
pub mod error;
pub mod observability;
