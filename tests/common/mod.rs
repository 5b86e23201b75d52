//! Shared integration-test harness for running the `picconf` binary and
//! locating fixture decks.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};

/// Helpers for invoking the compiled `picconf` binary.
pub struct PicConfProcess;

impl PicConfProcess {
    /// Runs `picconf` with the given arguments and waits for it to exit.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_command(args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_picconf"))
            .args(args)
            .env_remove("PICCONF_LOG_LEVEL")
            .env_remove("PICCONF_RANK")
            .env("NO_COLOR", "1")
            .output()
            .expect("failed to run picconf")
    }

    /// Returns the path to a test fixture.
    #[must_use]
    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    /// Reads a test fixture.
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn fixture(name: &str) -> String {
        std::fs::read_to_string(Self::fixture_path(name)).expect("fixture should exist")
    }
}
