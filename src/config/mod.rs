//! Deck configuration
//!
//! Parses declaration blocks, evaluates their numeric expressions, validates
//! them and freezes the normalized [`SimulationConfig`].

pub mod declaration;
pub mod expr;
pub mod loader;
pub mod schema;
pub mod validation;

pub use declaration::{BlockKind, Declaration, Deck};
pub use expr::{ExprError, Scalar, Scope};
pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoaderOptions};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
