//! Error types for packvar-core
//!
//! Problems in user-supplied sources are reported as [`Diagnostics`]; this
//! enum covers API misuse and failures outside the resolution phases.

use std::path::PathBuf;

use packvar_syntax::Diagnostics;

/// Result type for packvar-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in packvar-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Name does not match the identifier grammar
    #[error("Invalid identifier {name:?}: {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// A pack already has a dependency under this alias-or-name
    #[error("Pack {parent:?} already has a dependency named {name:?}")]
    DuplicateDependency { parent: String, name: String },

    /// Two packs in one tree compute the same package ID
    #[error("Package ID {id} is claimed by more than one pack")]
    AmbiguousPackage { id: String },

    /// Settings file with an unrecognised extension
    #[error("Unsupported settings format: {extension}")]
    UnsupportedFormat { extension: String },

    /// Settings file could not be parsed
    #[error("Failed to parse {format} settings at {path}: {message}")]
    SettingsParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    /// Resolution failed; every collected diagnostic is attached
    #[error("Variable resolution failed:\n{0}")]
    Resolution(#[from] Diagnostics),

    /// Error from the value domain
    #[error(transparent)]
    Value(#[from] packvar_value::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failure of a strict template lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("{key:?} not found in {path:?}")]
    MissingKey { path: String, key: String },

    #[error("value at {path:?} cannot be traversed by key {key:?}")]
    NotTraversable { path: String, key: String },
}
