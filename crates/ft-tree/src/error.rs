//! Error types for tree operations.

use ft_types::{PathError, SequenceError};
use thiserror::Error;

/// Failures a tree operation can report.
///
/// Successful lookups report what they found as a
/// [`NodeKind`](crate::NodeKind) instead of an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The operation is not legal in the tree's current lifecycle phase.
    #[error("initialization error: tree is {}", lifecycle(.initialized))]
    Initialization { initialized: bool },

    /// The path string is malformed.
    #[error("bad path: {0}")]
    BadPath(#[source] PathError),

    /// The path is not under the tree's single root, or would create a
    /// second root.
    #[error("conflicting path: {path}")]
    ConflictingPath { path: String },

    /// No node exists at the path, or a node's ancestry is inconsistent.
    #[error("no such path: {path}")]
    NoSuchPath { path: String },

    /// A directory was required but a file was found.
    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    /// A file was required but a directory was found.
    #[error("not a file: {path}")]
    NotAFile { path: String },

    /// A node with exactly this path already exists.
    #[error("already in tree: {path}")]
    AlreadyInTree { path: String },

    /// An allocation failed or the configured node limit was reached.
    #[error("memory error")]
    Memory,
}

fn lifecycle(initialized: &bool) -> &'static str {
    if *initialized {
        "already initialized"
    } else {
        "not initialized"
    }
}

impl TreeError {
    /// Stable snake_case name of the result kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Initialization { .. } => "initialization_error",
            Self::BadPath(_) => "bad_path",
            Self::ConflictingPath { .. } => "conflicting_path",
            Self::NoSuchPath { .. } => "no_such_path",
            Self::NotADirectory { .. } => "not_a_directory",
            Self::NotAFile { .. } => "not_a_file",
            Self::AlreadyInTree { .. } => "already_in_tree",
            Self::Memory => "memory_error",
        }
    }
}

impl From<PathError> for TreeError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::Alloc => Self::Memory,
            other => Self::BadPath(other),
        }
    }
}

impl From<SequenceError> for TreeError {
    fn from(err: SequenceError) -> Self {
        match err {
            SequenceError::Alloc(_) => Self::Memory,
            SequenceError::IndexOutOfRange { index, len } => Self::NoSuchPath {
                path: format!("child #{index} of {len}"),
            },
        }
    }
}

/// Convenience type alias for tree operations.
pub type TreeResult<T> = std::result::Result<T, TreeError>;
