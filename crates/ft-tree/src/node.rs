//! Tree nodes and the store that owns them.
//!
//! Every node lives in a [`Nodes`] store and is addressed by a [`NodeId`].
//! A directory's child sequence is the only downward link; a node's `parent`
//! id is used for upward queries only and never for destruction or counting.
//!
//! # Invariants
//!
//! - A directory's children are strictly ascending by path (no duplicates).
//! - A child's path is its parent's path plus exactly one component.
//! - Files never have a child sequence; directories never have contents.
//! - Ids are handed out from a monotonic counter and never reused.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

use ft_types::{Path, Sequence};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{TreeError, TreeResult};

/// Handle to a node in a [`Nodes`] store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a node is a directory or a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Directory,
    File,
}

impl NodeKind {
    pub fn is_file(self) -> bool {
        self == Self::File
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory => write!(f, "directory"),
            Self::File => write!(f, "file"),
        }
    }
}

/// What to create at a path: a directory, or a file with optional contents.
///
/// `length` is the caller-declared size of `contents` and must be zero
/// exactly when `contents` is `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry<C> {
    Directory,
    File { contents: Option<C>, length: usize },
}

impl<C> Entry<C> {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Directory => NodeKind::Directory,
            Self::File { .. } => NodeKind::File,
        }
    }
}

#[derive(Debug)]
enum Body<C> {
    Directory { children: Sequence<NodeId> },
    File { contents: Option<C>, length: usize },
}

/// One directory or file in the tree.
#[derive(Debug)]
pub struct Node<C> {
    path: Path,
    parent: Option<NodeId>,
    body: Body<C>,
}

impl<C> Node<C> {
    /// The node's absolute path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The containing directory, or `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            Body::Directory { .. } => NodeKind::Directory,
            Body::File { .. } => NodeKind::File,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.body, Body::File { .. })
    }

    /// File contents, or `None` for directories and empty files.
    pub fn contents(&self) -> Option<&C> {
        match &self.body {
            Body::File { contents, .. } => contents.as_ref(),
            Body::Directory { .. } => None,
        }
    }

    /// Declared length of the contents; zero for directories.
    pub fn length(&self) -> usize {
        match self.body {
            Body::File { length, .. } => length,
            Body::Directory { .. } => 0,
        }
    }

    /// The ordered child sequence. Only directories have one.
    pub fn children(&self) -> Option<&Sequence<NodeId>> {
        match &self.body {
            Body::Directory { children } => Some(children),
            Body::File { .. } => None,
        }
    }

    /// Number of children; zero for files.
    pub fn child_count(&self) -> usize {
        self.children().map_or(0, Sequence::len)
    }

    /// A fresh copy of the pathname.
    pub fn to_path_string(&self) -> String {
        self.path.as_str().to_string()
    }
}

/// Owning store for every node of a tree.
#[derive(Debug)]
pub struct Nodes<C> {
    slots: HashMap<NodeId, Node<C>>,
    next_id: u64,
    limit: Option<usize>,
    child_capacity: usize,
}

impl<C> Default for Nodes<C> {
    fn default() -> Self {
        Self::new(None, 0)
    }
}

impl<C> Nodes<C> {
    /// Create an empty store.
    ///
    /// `limit` caps the number of live nodes; `child_capacity` is the initial
    /// capacity of each new directory's child sequence.
    pub fn new(limit: Option<usize>, child_capacity: usize) -> Self {
        Self {
            slots: HashMap::new(),
            next_id: 0,
            limit,
            child_capacity,
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no nodes are live.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Look up a live node.
    pub fn get(&self, id: NodeId) -> Option<&Node<C>> {
        self.slots.get(&id)
    }

    /// Returns `true` if `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.contains_key(&id)
    }

    // ---------------------------------------------------------------
    // Creation and destruction
    // ---------------------------------------------------------------

    /// Create a node at `path` and link it under `parent`.
    ///
    /// Without a parent the path must have depth 1. With one, the parent
    /// must be a directory whose path is `path` minus its last component,
    /// and it must not already have a child at `path`. The new node keeps
    /// its own copy of `path` and is linked at the sorted insertion point.
    pub fn create(
        &mut self,
        path: &Path,
        parent: Option<NodeId>,
        entry: Entry<C>,
    ) -> TreeResult<NodeId> {
        let insert_at = match parent {
            Some(parent_id) => Some((parent_id, self.insertion_point(path, parent_id)?)),
            None => {
                if path.depth() != 1 {
                    return Err(TreeError::NoSuchPath {
                        path: path.to_string(),
                    });
                }
                None
            }
        };
        if self.limit.is_some_and(|limit| self.slots.len() >= limit) {
            return Err(TreeError::Memory);
        }

        let body = match entry {
            Entry::Directory => Body::Directory {
                children: Sequence::new(self.child_capacity)?,
            },
            Entry::File { contents, length } => Body::File { contents, length },
        };
        let node = Node {
            path: path.try_clone()?,
            parent,
            body,
        };

        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.slots.try_reserve(1).map_err(|_| TreeError::Memory)?;

        if let Some((parent_id, index)) = insert_at {
            self.children_mut(parent_id)?.add_at(index, id)?;
        }
        self.slots.insert(id, node);
        trace!(node = %id, %path, "created node");

        Ok(id)
    }

    /// Validate `path` as a new child of `parent_id` and find its slot.
    fn insertion_point(&self, path: &Path, parent_id: NodeId) -> TreeResult<usize> {
        let parent = self.slots.get(&parent_id).ok_or_else(|| TreeError::NoSuchPath {
            path: path.to_string(),
        })?;
        if parent.is_file() {
            return Err(TreeError::NotADirectory {
                path: parent.path.to_string(),
            });
        }

        let parent_depth = parent.path.depth();
        if path.shared_prefix_depth(&parent.path) < parent_depth {
            return Err(TreeError::ConflictingPath {
                path: path.to_string(),
            });
        }
        if path.depth() != parent_depth + 1 {
            return Err(TreeError::NoSuchPath {
                path: path.to_string(),
            });
        }

        match self.has_child(parent_id, path) {
            Ok(_) => Err(TreeError::AlreadyInTree {
                path: path.to_string(),
            }),
            Err(index) => Ok(index),
        }
    }

    fn children_mut(&mut self, id: NodeId) -> TreeResult<&mut Sequence<NodeId>> {
        match self.slots.get_mut(&id) {
            Some(Node {
                body: Body::Directory { children },
                ..
            }) => Ok(children),
            Some(node) => Err(TreeError::NotADirectory {
                path: node.path.to_string(),
            }),
            None => Err(TreeError::NoSuchPath {
                path: id.to_string(),
            }),
        }
    }

    /// Destroy the subtree rooted at `id` and return how many nodes it held.
    ///
    /// The node is unlinked from its parent first, then every descendant is
    /// released. Freeing an id that is not live removes nothing.
    pub fn free(&mut self, id: NodeId) -> usize {
        let Some(parent_id) = self.slots.get(&id).map(|node| node.parent) else {
            return 0;
        };

        if let Some(parent_id) = parent_id {
            let path = &self.slots[&id].path;
            let index = self.has_child(parent_id, path).ok();
            if let (Some(index), Ok(children)) = (index, self.children_mut(parent_id)) {
                children.remove_at(index);
            }
        }

        let removed = self.release(id);
        trace!(node = %id, removed, "freed subtree");
        removed
    }

    /// Drop `id` and its descendants without touching the parent's links.
    fn release(&mut self, id: NodeId) -> usize {
        let mut removed = 0;
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(node) = self.slots.remove(&id) else {
                continue;
            };
            removed += 1;
            if let Body::Directory { children } = node.body {
                pending.extend(children.iter().copied());
            }
        }
        removed
    }

    // ---------------------------------------------------------------
    // Child queries
    // ---------------------------------------------------------------

    /// Binary search `parent`'s children for `path`.
    ///
    /// Returns `Ok(index)` of the existing child, or `Err(index)` where such
    /// a child would be inserted. A file or dead id has no children, so the
    /// result is `Err(0)`.
    pub fn has_child(&self, parent: NodeId, path: &Path) -> Result<usize, usize> {
        let Some(children) = self.slots.get(&parent).and_then(Node::children) else {
            return Err(0);
        };
        children.bsearch(|child| match self.slots.get(child) {
            Some(node) => node.path.compare_path(path),
            None => Ordering::Less,
        })
    }

    /// The child of `parent` at `index`.
    pub fn child(&self, parent: NodeId, index: usize) -> TreeResult<NodeId> {
        self.slots
            .get(&parent)
            .and_then(Node::children)
            .and_then(|children| children.get(index))
            .copied()
            .ok_or_else(|| TreeError::NoSuchPath {
                path: match self.slots.get(&parent) {
                    Some(node) => format!("{}[{index}]", node.path),
                    None => parent.to_string(),
                },
            })
    }

    /// Number of children of `parent`; zero for files and dead ids.
    pub fn child_count(&self, parent: NodeId) -> usize {
        self.slots.get(&parent).map_or(0, Node::child_count)
    }

    /// Order two live nodes by path.
    pub fn compare(&self, first: NodeId, second: NodeId) -> Ordering {
        self[first].path.compare_path(&self[second].path)
    }

    // ---------------------------------------------------------------
    // Contents
    // ---------------------------------------------------------------

    /// Swap a file's contents and return the previous value.
    pub fn edit_contents(
        &mut self,
        id: NodeId,
        contents: Option<C>,
        length: usize,
    ) -> TreeResult<Option<C>> {
        match self.slots.get_mut(&id) {
            Some(Node {
                body:
                    Body::File {
                        contents: old_contents,
                        length: old_length,
                    },
                ..
            }) => {
                *old_length = length;
                Ok(std::mem::replace(old_contents, contents))
            }
            Some(node) => Err(TreeError::NotAFile {
                path: node.path.to_string(),
            }),
            None => Err(TreeError::NoSuchPath {
                path: id.to_string(),
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn children_for_test(&mut self, id: NodeId) -> &mut Sequence<NodeId> {
        match self.children_mut(id) {
            Ok(children) => children,
            Err(err) => panic!("{err}"),
        }
    }
}

/// Indexing by a live id.
///
/// # Panics
///
/// Panics if `id` is not live. Ids reachable from the tree's root are always
/// live, so this only fires on a bug in the caller.
impl<C> Index<NodeId> for Nodes<C> {
    type Output = Node<C>;

    fn index(&self, id: NodeId) -> &Node<C> {
        match self.slots.get(&id) {
            Some(node) => node,
            None => panic!("node {id} is not live"),
        }
    }
}
