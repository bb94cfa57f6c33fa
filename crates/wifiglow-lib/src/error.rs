//! Unified error type for the wifiglow-lib crate.
//!
//! [`WifiglowError`] covers the failures collaborators can report (I/O,
//! credential storage, reachability transport) plus configuration and color
//! validation. The controller itself never surfaces these; it logs them and
//! falls back to a defined mode or effect.

use std::fmt;

/// Unified error type for wifiglow-lib operations.
#[derive(Debug)]
pub enum WifiglowError {
    /// Standard I/O error (config or credential file read/write).
    Io(std::io::Error),
    /// Configuration parsing or validation error.
    Config(String),
    /// Credential store error (unreadable or unwritable backing storage).
    Store(String),
    /// Reachability transport error (timeout, refused connection, bad URL).
    Transport(String),
    /// Strict color parsing error.
    Color(String),
}

impl fmt::Display for WifiglowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WifiglowError::Io(e) => write!(f, "I/O error: {e}"),
            WifiglowError::Config(e) => write!(f, "Config error: {e}"),
            WifiglowError::Store(e) => write!(f, "Credential store error: {e}"),
            WifiglowError::Transport(e) => write!(f, "Transport error: {e}"),
            WifiglowError::Color(e) => write!(f, "Color error: {e}"),
        }
    }
}

impl std::error::Error for WifiglowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WifiglowError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WifiglowError {
    fn from(e: std::io::Error) -> Self {
        WifiglowError::Io(e)
    }
}

/// Crate-level Result alias using [`WifiglowError`].
pub type Result<T> = std::result::Result<T, WifiglowError>;
