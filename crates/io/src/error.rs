use std::path::PathBuf;

use thiserror::Error;

use crate::encoding::{format_attempts, TextEncoding};

/// A tabular source could not be turned into usable rows.
///
/// `origin` is a human-readable location: a file path, or `path#table` for a
/// GeoPackage table.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}: could not decode with any supported encoding (tried {})", format_attempts(.attempted))]
    Encoding {
        origin: String,
        attempted: Vec<TextEncoding>,
    },

    #[error("{origin}: malformed CSV: {message}")]
    Csv { origin: String, message: String },

    #[error("{origin}: database error: {source}")]
    Database {
        origin: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{origin}: table '{table}' not found")]
    MissingTable { origin: String, table: String },

    #[error("{origin}: missing required column '{column}'")]
    MissingColumn { origin: String, column: String },

    #[error("{origin}: duplicate feature name '{name}'")]
    DuplicateFeature { origin: String, name: String },

    #[error("{origin}: no header row")]
    Empty { origin: String },

    #[error("{}: {message}", .path.display())]
    InvalidSource { path: PathBuf, message: String },
}

impl DataLoadError {
    pub(crate) fn database(origin: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Database { origin: origin.into(), source }
    }
}
