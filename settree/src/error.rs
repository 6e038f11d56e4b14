//! Error types and result definitions for settings operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::value::ValueKind;

/// Errors produced by settings stores, the value formatter and the tree
/// controller.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Underlying file system failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML document could not be parsed.
    #[error("failed to parse TOML: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML document could not be produced.
    #[error("failed to write TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON document could not be parsed or produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File extension does not name a supported format.
    #[error("unsupported settings format: {0:?}")]
    UnsupportedFormat(String),

    /// The store cannot persist writes.
    #[error("settings store is read only: {0}")]
    ReadOnly(String),

    /// Edited text does not match the validator of its type.
    #[error("{text:?} is not a valid {kind} value")]
    InvalidInput { kind: ValueKind, text: String },

    /// An encoded value on disk could not be decoded.
    #[error("cannot decode stored value {0:?}")]
    Decode(String),

    /// No node or key exists at the given path.
    #[error("no setting at {0:?}")]
    NotFound(String),

    /// The node exists but cannot be edited in place.
    #[error("setting {0:?} cannot be edited")]
    NotEditable(String),

    /// Commit or cancel was requested while nothing is being edited.
    #[error("no edit in progress")]
    NoEditInProgress,
}

impl SettingsError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SettingsError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SettingsError>;
