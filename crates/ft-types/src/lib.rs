//! Foundation types for the in-memory file tree.
//!
//! This crate provides the two leaf services every other `ft` crate builds on.
//! Neither type knows anything about nodes or trees.
//!
//! # Key Types
//!
//! - [`Path`]: Validated absolute path, ordered component-wise
//! - [`Sequence`]: Growable array with sorted insertion and bisection search
//!
//! Allocation in both types goes through `try_reserve`, so running out of
//! memory surfaces as an error value instead of an abort.

pub mod error;
pub mod path;
pub mod sequence;

pub use error::{PathError, PathResult, SequenceError, SequenceResult};
pub use path::Path;
pub use sequence::Sequence;
