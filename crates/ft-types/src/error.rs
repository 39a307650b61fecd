use thiserror::Error;

/// Errors produced while parsing or slicing a [`Path`](crate::Path).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path is not absolute: {0:?}")]
    NotAbsolute(String),

    #[error("path has no components: {0:?}")]
    NoComponents(String),

    #[error("path has an empty component: {0:?}")]
    EmptyComponent(String),

    #[error("reserved component {component:?} in path {path:?}")]
    ReservedComponent { path: String, component: String },

    #[error("forbidden character {ch:?} in path {path:?}")]
    ForbiddenChar { path: String, ch: char },

    #[error("prefix level {level} out of range for path of depth {depth}")]
    PrefixOutOfRange { level: usize, depth: usize },

    #[error("allocation failed while building path")]
    Alloc,
}

/// Result alias for path operations.
pub type PathResult<T> = Result<T, PathError>;

/// Errors produced by [`Sequence`](crate::Sequence) mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("allocation failed: {0}")]
    Alloc(#[from] std::collections::TryReserveError),
}

/// Result alias for sequence operations.
pub type SequenceResult<T> = Result<T, SequenceError>;
