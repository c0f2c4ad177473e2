//! Error types for the swf-scene library.

use std::path::PathBuf;
use thiserror::Error;

use crate::stream::TagCode;

/// Main error type for SWF scene operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A read ran past the end of the command's byte range
    #[error("Stream underrun at byte {offset}: need {needed} more byte(s), range is {len} byte(s)")]
    StreamUnderrun { offset: usize, needed: usize, len: usize },

    /// Character id is not assigned in the dictionary
    #[error("Unresolved character id {0}")]
    UnresolvedReference(u16),

    /// Character id resolves to an entry of the wrong kind
    #[error("Character {id} is a {actual}, expected {expected}")]
    KindMismatch { id: u16, expected: String, actual: String },

    /// Opcode is recognized but has no decoder
    #[error("Unsupported tag: {0}")]
    UnsupportedTag(TagCode),

    /// Character id registered twice
    #[error("Duplicate character id {0}")]
    DuplicateCharacter(u16),

    /// Frame offset table or command ranges are inconsistent
    #[error("Invalid frame table: {0}")]
    InvalidFrameTable(String),

    /// Frame index out of bounds
    #[error("Frame {frame} out of bounds (count: {count})")]
    FrameOutOfBounds { frame: u32, count: u32 },

    /// Clip action records could not be skipped safely
    #[error("Malformed clip actions: {0}")]
    MalformedClipActions(String),

    /// Invalid data structure in the document
    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Document or options JSON could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// True for errors that mean the input stream itself is corrupt.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::StreamUnderrun { .. } | Self::MalformedClipActions(_) | Self::Utf8(_)
        )
    }
}

/// Result type alias for SWF scene operations.
pub type Result<T> = std::result::Result<T, Error>;
