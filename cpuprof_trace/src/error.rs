//! Error type shared by the conversion pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while turning CPU profiles into a trace.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("no CPU profiles provided")]
    EmptyInput,

    #[error("invalid {field} {value}: expected a non-negative 32-bit integer")]
    InvalidIdentifier { field: &'static str, value: i64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("trace output error: {0}")]
    Format(#[from] ctef::Error),

    #[error("no .cpuprofile files found in '{}'", .0.display())]
    NoProfiles(PathBuf),
}

pub type Result<T> = std::result::Result<T, TraceError>;
