//! CLI error type.

use std::fmt;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// The fixture file could not be loaded or parsed.
    Fixture(String),
    /// The cache directory could not be opened.
    Store(String),
    /// The preload run failed.
    Preload(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixture(msg) => write!(f, "fixture error: {msg}"),
            Self::Store(msg) => write!(f, "cache store error: {msg}"),
            Self::Preload(msg) => write!(f, "preload error: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}
