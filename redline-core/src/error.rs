//! Error types for redline-core.
//!
//! Each subsystem gets its own enum so callers can match on the failure that
//! matters to them. Storage failures carry the operation name into the message
//! shown in the status bar; selection and setup failures are recoverable and
//! never abort the event loop.

use thiserror::Error;

/// Failures from the comment / review storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("comment not found: {0}")]
    NotFound(String),

    #[error("invalid stored value: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Connection(#[from] tokio_rusqlite::Error),
}

/// Rejections when constructing a [`crate::types::Comment`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentError {
    #[error("comment text is empty")]
    EmptyText,

    #[error("line numbers start at 1")]
    ZeroLine,

    #[error("end line {end} is before start line {start}")]
    InvertedRange { start: u32, end: u32 },
}

/// Why a completing activation did not produce a line range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Invalid line range selected: {anchor_file} and {end_file} are different files")]
    CrossFile { anchor_file: String, end_file: String },

    #[error("Invalid line range selected")]
    EmptyRange,
}

/// Why annotation setup was abandoned for a render cycle.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("diff rows did not appear after {attempts} attempts")]
    RowsNotReady { attempts: u32 },

    #[error("render {generation} was replaced before setup finished")]
    Superseded { generation: u64 },

    #[error("Failed to load comments: {0}")]
    Store(#[from] StoreError),
}
