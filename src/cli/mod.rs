//! Command-line interface
//!
//! Argument definitions and command handlers for the `picconf` binary.

pub mod args;
pub mod commands;
