//! Input-stage errors. Everything past input loading degrades with warnings
//! and safe fallbacks instead of propagating.

use std::fmt;

/// Errors that abort a run: missing or unreadable input files and malformed
/// JSON payloads.
#[derive(Debug)]
pub enum DispatchError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Io(err) => write!(f, "input file error: {err}"),
            DispatchError::Json(err) => write!(f, "malformed JSON: {err}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Io(err) => Some(err),
            DispatchError::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        DispatchError::Io(err)
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Json(err)
    }
}
