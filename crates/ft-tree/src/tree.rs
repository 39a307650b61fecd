//! The file tree handle and its operations.

use ft_types::{Path, Sequence};
use serde::Serialize;
use tracing::{debug, trace};

use crate::builder::PathBuilder;
use crate::checker::{self, CheckReport};
use crate::config::TreeConfig;
use crate::error::{TreeError, TreeResult};
use crate::node::{Entry, NodeId, NodeKind, Nodes};

/// What [`FileTree::stat`] reports about a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Stat {
    pub is_file: bool,
    /// Declared length of a file's contents; zero for directories.
    pub size: usize,
}

/// An in-memory hierarchy of directories and files under a single root.
///
/// A tree starts uninitialized; every operation other than [`init`] and
/// [`render`] fails with [`TreeError::Initialization`] until [`init`] is
/// called. Intermediate directories are created on demand by the insert
/// operations.
///
/// `C` is the file payload type. The tree stores it by value and hands out
/// references to it; the declared length travels alongside it.
///
/// [`init`]: Self::init
/// [`render`]: Self::render
///
/// # Examples
///
/// ```
/// use ft_tree::FileTree;
///
/// let mut tree: FileTree<&str> = FileTree::default();
/// tree.init().unwrap();
/// tree.insert_file("/a/b/c.txt", Some("hi"), 2).unwrap();
/// assert!(tree.contains_directory("/a/b"));
/// assert_eq!(tree.get_file_contents("/a/b/c.txt").unwrap(), Some(&"hi"));
/// assert_eq!(tree.render().unwrap(), "/a\n/a/b\n/a/b/c.txt\n");
/// ```
#[derive(Debug)]
pub struct FileTree<C> {
    config: TreeConfig,
    nodes: Nodes<C>,
    root: Option<NodeId>,
    count: usize,
    initialized: bool,
}

impl<C> Default for FileTree<C> {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

impl<C> FileTree<C> {
    /// Create an uninitialized tree.
    pub fn new(config: TreeConfig) -> Self {
        let nodes = Nodes::new(config.node_limit, config.child_capacity);
        Self {
            config,
            nodes,
            root: None,
            count: 0,
            initialized: false,
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Read access to the node store.
    pub fn nodes(&self) -> &Nodes<C> {
        &self.nodes
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Move the tree into the initialized, empty state.
    pub fn init(&mut self) -> TreeResult<()> {
        self.verify("before init");
        if self.initialized {
            debug!("init rejected: already initialized");
            return Err(TreeError::Initialization { initialized: true });
        }
        self.initialized = true;
        self.root = None;
        self.count = 0;
        self.verify("after init");
        debug!("tree initialized");
        Ok(())
    }

    /// Free every node and return to the uninitialized state.
    pub fn destroy(&mut self) -> TreeResult<()> {
        self.verify("before destroy");
        if !self.initialized {
            debug!("destroy rejected: not initialized");
            return Err(TreeError::Initialization { initialized: false });
        }
        let removed = match self.root.take() {
            Some(root) => self.nodes.free(root),
            None => 0,
        };
        self.count -= removed;
        self.initialized = false;
        self.verify("after destroy");
        debug!(removed, "tree destroyed");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Insert a directory, creating any missing ancestors.
    pub fn insert_directory(&mut self, pathname: &str) -> TreeResult<()> {
        self.verify("before insert_directory");
        let result = self.insert(pathname, Entry::Directory);
        self.verify("after insert_directory");
        result
    }

    /// Insert a file, creating any missing ancestors as directories.
    ///
    /// `length` is the declared size of `contents` and must be zero exactly
    /// when `contents` is `None`. A file cannot be the tree's root, so a
    /// depth-1 path on an empty tree is a conflicting path.
    ///
    /// # Panics
    ///
    /// In debug builds, if `contents.is_some()` disagrees with `length != 0`.
    pub fn insert_file(
        &mut self,
        pathname: &str,
        contents: Option<C>,
        length: usize,
    ) -> TreeResult<()> {
        debug_assert!(
            contents.is_some() == (length != 0),
            "contents must be present exactly when length is nonzero (length {length})"
        );
        self.verify("before insert_file");
        let result = self.insert(pathname, Entry::File { contents, length });
        self.verify("after insert_file");
        result
    }

    /// Remove a directory and everything below it.
    pub fn remove_directory(&mut self, pathname: &str) -> TreeResult<()> {
        self.verify("before remove_directory");
        let result = self.remove(pathname, NodeKind::Directory);
        self.verify("after remove_directory");
        result
    }

    /// Remove a file.
    pub fn remove_file(&mut self, pathname: &str) -> TreeResult<()> {
        self.verify("before remove_file");
        let result = self.remove(pathname, NodeKind::File);
        self.verify("after remove_file");
        result
    }

    /// Swap a file's contents, returning the previous contents.
    ///
    /// # Panics
    ///
    /// In debug builds, if `contents.is_some()` disagrees with `length != 0`.
    pub fn replace_file_contents(
        &mut self,
        pathname: &str,
        contents: Option<C>,
        length: usize,
    ) -> TreeResult<Option<C>> {
        debug_assert!(
            contents.is_some() == (length != 0),
            "contents must be present exactly when length is nonzero (length {length})"
        );
        self.verify("before replace_file_contents");
        let result = self
            .find_file(pathname)
            .and_then(|id| self.nodes.edit_contents(id, contents, length));
        self.verify("after replace_file_contents");
        match &result {
            Ok(_) => debug!(path = pathname, length, "replaced file contents"),
            Err(err) => debug!(path = pathname, error = %err, "replace rejected"),
        }
        result
    }

    fn insert(&mut self, pathname: &str, entry: Entry<C>) -> TreeResult<()> {
        let kind = entry.kind();
        match self.try_insert(pathname, entry) {
            Ok(created) => {
                debug!(path = pathname, %kind, created, count = self.count, "inserted");
                Ok(())
            }
            Err(err) => {
                debug!(path = pathname, %kind, error = %err, "insert rejected");
                Err(err)
            }
        }
    }

    fn try_insert(&mut self, pathname: &str, entry: Entry<C>) -> TreeResult<usize> {
        self.ensure_initialized()?;
        let path = Path::new(pathname)?;

        let anchor = self.traverse(&path)?;
        let start = match anchor {
            Some(id) => {
                let found = self.nodes[id].path();
                if found == &path {
                    return Err(TreeError::AlreadyInTree {
                        path: path.to_string(),
                    });
                }
                found.depth() + 1
            }
            None => {
                if entry.kind().is_file() && path.depth() == 1 {
                    return Err(TreeError::ConflictingPath {
                        path: path.to_string(),
                    });
                }
                1
            }
        };

        let mut builder = PathBuilder::new(&mut self.nodes, anchor);
        for level in start..path.depth() {
            builder.push(&path.prefix(level)?, Entry::Directory)?;
        }
        builder.push(&path, entry)?;
        let (first, created) = builder.commit();

        if self.root.is_none() {
            self.root = first;
        }
        self.count += created;
        Ok(created)
    }

    fn remove(&mut self, pathname: &str, expected: NodeKind) -> TreeResult<()> {
        let result = self.find_node(pathname).and_then(|(id, kind)| {
            if kind == expected {
                Ok(id)
            } else {
                Err(wrong_kind(expected, pathname))
            }
        });
        let id = match result {
            Ok(id) => id,
            Err(err) => {
                debug!(path = pathname, kind = %expected, error = %err, "remove rejected");
                return Err(err);
            }
        };

        let removed = self.nodes.free(id);
        self.count -= removed;
        if self.count == 0 {
            self.root = None;
        }
        debug!(path = pathname, kind = %expected, removed, count = self.count, "removed");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Returns `true` if a directory exists at the path.
    pub fn contains_directory(&self, pathname: &str) -> bool {
        matches!(self.find_node(pathname), Ok((_, NodeKind::Directory)))
    }

    /// Returns `true` if a file exists at the path.
    pub fn contains_file(&self, pathname: &str) -> bool {
        matches!(self.find_node(pathname), Ok((_, NodeKind::File)))
    }

    /// The contents of the file at the path.
    ///
    /// `Ok(None)` means the file exists but has no contents.
    pub fn get_file_contents(&self, pathname: &str) -> TreeResult<Option<&C>> {
        let id = self.find_file(pathname)?;
        Ok(self.nodes[id].contents())
    }

    /// Report whether the node at the path is a file, and its size.
    pub fn stat(&self, pathname: &str) -> TreeResult<Stat> {
        let (id, kind) = self.find_node(pathname)?;
        Ok(Stat {
            is_file: kind.is_file(),
            size: self.nodes[id].length(),
        })
    }

    /// Locate the node at exactly `pathname` and report its kind.
    pub fn find_node(&self, pathname: &str) -> TreeResult<(NodeId, NodeKind)> {
        self.ensure_initialized()?;
        let path = Path::new(pathname)?;
        match self.traverse(&path)? {
            Some(id) if self.nodes[id].path() == &path => Ok((id, self.nodes[id].kind())),
            _ => Err(TreeError::NoSuchPath {
                path: path.to_string(),
            }),
        }
    }

    fn find_file(&self, pathname: &str) -> TreeResult<NodeId> {
        match self.find_node(pathname)? {
            (id, NodeKind::File) => Ok(id),
            (_, NodeKind::Directory) => Err(wrong_kind(NodeKind::File, pathname)),
        }
    }

    /// Walk from the root toward `path` as far as existing nodes allow.
    ///
    /// Returns the deepest node whose path is a prefix of `path`, or `None`
    /// if the tree is empty. Stopping at a file short of `path` is an error,
    /// since nothing can exist below a file.
    fn traverse(&self, path: &Path) -> TreeResult<Option<NodeId>> {
        let Some(root) = self.root else {
            return Ok(None);
        };
        if self.nodes[root].path() != &path.prefix(1)? {
            return Err(TreeError::ConflictingPath {
                path: path.to_string(),
            });
        }

        let mut current = root;
        for level in 2..=path.depth() {
            if self.nodes[current].is_file() {
                break;
            }
            let prefix = path.prefix(level)?;
            match self.nodes.has_child(current, &prefix) {
                Ok(index) => {
                    current = self.nodes.child(current, index)?;
                    trace!(path = %prefix, "descended");
                }
                Err(_) => break,
            }
        }

        let furthest = &self.nodes[current];
        if furthest.is_file() && furthest.path() != path {
            return Err(TreeError::NotADirectory {
                path: furthest.path().to_string(),
            });
        }
        Ok(Some(current))
    }

    fn ensure_initialized(&self) -> TreeResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(TreeError::Initialization { initialized: false })
        }
    }

    // ---------------------------------------------------------------
    // Rendering
    // ---------------------------------------------------------------

    /// Render every path in the tree, one per line.
    ///
    /// Each directory is followed by its files, then by each of its
    /// subdirectories in turn, all in sorted order. Every line ends with a
    /// newline. Returns `None` if the tree is not initialized or the buffer
    /// cannot be allocated.
    pub fn render(&self) -> Option<String> {
        if !self.initialized {
            return None;
        }

        let mut listing = Sequence::new(self.count).ok()?;
        if let Some(root) = self.root {
            self.collect_listing(root, &mut listing).ok()?;
        }

        let mut total = 0;
        listing.map(&mut total, |id, acc| {
            *acc += self.nodes[*id].path().str_len() + 1;
        });

        let mut out = String::new();
        out.try_reserve_exact(total).ok()?;
        listing.map(&mut out, |id, acc| {
            acc.push_str(self.nodes[*id].path().as_str());
            acc.push('\n');
        });
        Some(out)
    }

    fn collect_listing(&self, root: NodeId, listing: &mut Sequence<NodeId>) -> TreeResult<()> {
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            listing.add_at(listing.len(), id)?;
            let Some(children) = self.nodes[id].children() else {
                continue;
            };
            for child in children.iter().filter(|c| self.nodes[**c].is_file()) {
                listing.add_at(listing.len(), *child)?;
            }
            // reversed so the smallest subdirectory is popped first
            pending.extend(
                children
                    .iter()
                    .rev()
                    .filter(|c| !self.nodes[**c].is_file())
                    .copied(),
            );
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Verification
    // ---------------------------------------------------------------

    /// Check every structural invariant of the tree.
    pub fn check(&self) -> CheckReport {
        checker::is_valid(&self.nodes, self.initialized, self.root, self.count)
    }

    /// Panic if verification is enabled and the tree is corrupt.
    fn verify(&self, stage: &str) {
        if !self.config.verify.is_enabled() {
            return;
        }
        let report = self.check();
        assert!(report.is_valid(), "file tree invariant broken {stage}: {report}");
    }
}

fn wrong_kind(expected: NodeKind, pathname: &str) -> TreeError {
    let path = pathname.to_string();
    match expected {
        NodeKind::Directory => TreeError::NotADirectory { path },
        NodeKind::File => TreeError::NotAFile { path },
    }
}
