//! Observability
//!
//! Structured logging for deck loading.

pub mod logging;

pub use logging::{LogFormat, init_logging};
