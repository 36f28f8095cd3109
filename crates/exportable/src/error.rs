//! Error types for the export/import system
//!
//! One error enum per concern: the persistence seam, the textual codecs,
//! configuration loading, and the two top-level operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for persistence operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for codec operations
pub type FormatResult<T> = Result<T, FormatError>;

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type alias for import operations
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors raised by a [`RecordStore`](crate::model::RecordStore) implementation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A class name that does not resolve to a known persistable type
    #[error("Unknown class '{0}'")]
    UnknownClass(String),

    #[error("Unknown attribute '{attribute}' for class '{class_name}'")]
    UnknownAttribute {
        class_name: String,
        attribute: String,
    },

    #[error("Unknown association '{association}' for class '{class_name}'")]
    UnknownAssociation {
        class_name: String,
        association: String,
    },

    /// Invalid association configuration
    #[error("Invalid association configuration: {0}")]
    Configuration(String),

    /// Primary key value that cannot be used as a key
    #[error("Invalid key error: {0}")]
    InvalidKey(String),

    /// Record validation failed on save
    #[error("Validation failed for {class_name}: {message}")]
    Validation { class_name: String, message: String },

    /// Uniqueness or key constraint violation on save
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// An operation needed a persisted record but got a new one
    #[error("Record of class '{0}' has not been saved")]
    NotPersisted(String),

    /// A to-one association resolved to several records
    #[error("Association '{association}' on '{class_name}' is to-one but returned {count} records")]
    Cardinality {
        class_name: String,
        association: String,
        count: usize,
    },

    /// Transaction bookkeeping error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Backing storage I/O error (fixture files and the like)
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors raised while encoding or decoding documents
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Unsupported format '{0}', expected json or yaml")]
    Unsupported(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration loading errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {field}, expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// Export was invoked on something that is not a record or a homogeneous collection
    #[error("Invalid export input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Import errors
#[derive(Error, Debug)]
pub enum ImportError {
    /// A required import parameter was not provided
    #[error("{0} is required.")]
    MissingParameter(&'static str),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Saving a record failed; carries the record state at the point of failure
    #[error("{source} - details: {details}")]
    Save {
        class_name: String,
        details: String,
        #[source]
        source: StoreError,
    },

    /// Natural-key lookup found more than one candidate
    #[error("Ambiguous natural key match for {class_name}: {count} records match {criteria}")]
    AmbiguousMatch {
        class_name: String,
        criteria: String,
        count: usize,
    },

    /// Structurally invalid document
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}
