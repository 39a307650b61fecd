//! All-or-nothing construction of a chain of new nodes.

use ft_types::Path;
use tracing::debug;

use crate::error::TreeResult;
use crate::node::{Entry, NodeId, Nodes};

/// Creates nodes one level at a time below an existing anchor.
///
/// Each [`push`](Self::push) links a new node under the previous one. If the
/// builder is dropped before [`commit`](Self::commit), the first node it
/// created is freed along with everything below it, leaving the store as it
/// was before the builder started.
pub(crate) struct PathBuilder<'a, C> {
    nodes: &'a mut Nodes<C>,
    first: Option<NodeId>,
    current: Option<NodeId>,
    created: usize,
}

impl<'a, C> PathBuilder<'a, C> {
    /// Start building below `anchor`, or as a new root when `None`.
    pub(crate) fn new(nodes: &'a mut Nodes<C>, anchor: Option<NodeId>) -> Self {
        Self {
            nodes,
            first: None,
            current: anchor,
            created: 0,
        }
    }

    /// Create the next level under the most recent node.
    pub(crate) fn push(&mut self, path: &Path, entry: Entry<C>) -> TreeResult<NodeId> {
        let id = self.nodes.create(path, self.current, entry)?;
        if self.first.is_none() {
            self.first = Some(id);
        }
        self.current = Some(id);
        self.created += 1;
        Ok(id)
    }

    /// Keep everything built so far.
    ///
    /// Returns the topmost new node and the number of nodes created.
    pub(crate) fn commit(mut self) -> (Option<NodeId>, usize) {
        (self.first.take(), self.created)
    }
}

impl<C> Drop for PathBuilder<'_, C> {
    fn drop(&mut self) {
        if let Some(first) = self.first.take() {
            let freed = self.nodes.free(first);
            debug!(node = %first, freed, "rolled back partial insert");
        }
    }
}
