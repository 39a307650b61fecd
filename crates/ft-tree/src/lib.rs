//! In-memory hierarchical file tree.
//!
//! This crate provides:
//! - `FileTree`, a single-rooted tree of directories and files addressed by
//!   absolute paths, with on-demand creation of intermediate directories
//! - `Nodes`, the node store that owns every node and keeps siblings sorted
//! - All-or-nothing multi-level insertion
//! - A structural checker that can run around every mutation
//! - Deterministic text rendering of the whole tree

mod builder;
pub mod checker;
pub mod config;
pub mod error;
pub mod node;
pub mod tree;

pub use checker::{CheckReport, TreeView, Violation, ViolationKind};
pub use config::{TreeConfig, VerifyMode};
pub use error::{TreeError, TreeResult};
pub use node::{Entry, Node, NodeId, NodeKind, Nodes};
pub use tree::{FileTree, Stat};
