//! All error types for the locforge crate.
//!
//! Persistence failures of the background saver never surface here; they are
//! logged where they happen.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid data: {0}")]
    DataMismatch(String),

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("id already exists: {0}")]
    IdAlreadyExists(String),

    #[error("a project already exists in {}", .0.display())]
    ProjectExists(PathBuf),

    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("missing required value: {0}")]
    MissingValue(String),

    #[error("failed to import {}: {source}", path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Creates a new validation error
    pub fn validation_error(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Wraps an error with the path of the file being imported.
    pub fn import_error(path: impl Into<PathBuf>, source: Error) -> Self {
        Error::Import {
            path: path.into(),
            source: Box::new(source),
        }
    }
}
