//! Error handling for the cohort ETL pipeline.

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;

use crate::schema::ColumnType;

/// Errors that can occur during pipeline runs and analytics
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown dataset key or invalid registry configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source file missing at extraction time
    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Malformed source content
    #[error("Failed to parse {}: {message}", .path.display())]
    Parse {
        /// Path of the offending source file
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Required schema columns missing after standardization
    #[error("Validation failed for '{dataset}': missing columns {missing:?}")]
    Validation {
        /// Dataset key the table was validated against
        dataset: String,
        /// Schema columns absent from the table
        missing: Vec<String>,
    },

    /// Two column names collide after standardization
    #[error("Duplicate column name '{0}' after standardization")]
    DuplicateColumn(String),

    /// Per-column type coercion failure during transform
    #[error("Failed to coerce column '{column}' to {ty}: {message}")]
    Coercion {
        /// Offending column
        column: String,
        /// Declared semantic type
        ty: ColumnType,
        /// What went wrong
        message: String,
    },

    /// Column expected by an analytics routine is not in the table
    #[error("Column '{0}' not found")]
    MissingColumn(String),

    /// Output destination failure
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Prediction model failure, or no model loaded
    #[error("Model error: {0}")]
    Model(String),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

/// Result type for cohort ETL operations
pub type Result<T> = std::result::Result<T, Error>;
