//! Error type shared by all store operations.

use thiserror::Error;

//-----------------------------------------------------------------------------

/// Errors from building, serializing, and persisting sequence groups.
///
/// None of the operations retry internally.
/// Database, JSON, and I/O errors are passed through unchanged.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record without a run identifier was given to a group.
    #[error("Cannot add an anonymous run to a group")]
    AnonymousRecord,

    /// A record in a batch belongs to another group.
    #[error("Group cross check failed: run {run} belongs to group {found}, not {expected}")]
    GroupMismatch {
        run: String,
        expected: String,
        found: String,
    },

    /// Compressed sequence bytes are not in the expected format.
    #[error("Malformed sequence payload: {0}")]
    MalformedPayload(String),

    /// No stored object matches the key.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The key does not identify any kind of stored object.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Attempted to modify a frozen collection.
    #[error("Cannot modify a frozen collection")]
    FrozenMutation,

    /// A JSON document has the wrong type tag.
    #[error("Document of type {found} is not compatible with {expected}")]
    IncompatibleDocument {
        expected: String,
        found: String,
    },

    /// A JSON document is structurally valid but its content is not.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// An input file could not be parsed.
    #[error("Parse error on line {line}: {message}")]
    Parse {
        line: usize,
        message: String,
    },

    /// A store parameter is out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The database was created by another version.
    #[error("Unsupported database version: {found} (expected {expected})")]
    UnsupportedVersion {
        found: String,
        expected: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
