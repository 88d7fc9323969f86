//! Error types for the pet_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for pet_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Couple or pet absent
    #[error("{0}")]
    NotFound(String),

    /// Missing/invalid field, unknown catalog tag, unmet prerequisite,
    /// active cooldown, or non-member acting user
    #[error("{0}")]
    Validation(String),

    /// Duplicate couple or pet creation
    #[error("{0}")]
    Conflict(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Persistence store failure that is not a plain IO error
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Coarse classification used by the boundary layer.
///
/// `NotFound`, `Validation` and `Conflict` mean the request was invalid;
/// `Operational` means the system could not complete a valid request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Operational,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Conflict(_) => ErrorKind::Conflict,
            _ => ErrorKind::Operational,
        }
    }

    /// True for errors caused by the request rather than by the system
    pub fn is_domain(&self) -> bool {
        self.kind() != ErrorKind::Operational
    }
}
