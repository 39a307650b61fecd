//! Structural invariant checks over a node store.
//!
//! The checker is read-only and never panics. Every violation it finds is
//! recorded in a [`CheckReport`] and logged at `error` level; callers decide
//! whether a failed report is fatal.

use std::cmp::Ordering;
use std::fmt;

use ft_types::Path;
use serde::Serialize;
use tracing::error;

use crate::node::{NodeId, Nodes};

/// Read access to the node data the checker inspects.
///
/// [`Nodes`] is the production implementation. Every method other than
/// [`path`](Self::path) may assume `id` is live.
pub trait TreeView {
    /// The node's path, or `None` if `id` does not refer to a live node.
    fn path(&self, id: NodeId) -> Option<&Path>;
    fn parent(&self, id: NodeId) -> Option<NodeId>;
    fn is_file(&self, id: NodeId) -> bool;
    /// Whether the node carries a child collection at all.
    fn has_child_collection(&self, id: NodeId) -> bool;
    fn has_contents(&self, id: NodeId) -> bool;
    fn length(&self, id: NodeId) -> usize;
    /// Number of children the node claims to have.
    fn child_count(&self, id: NodeId) -> usize;
    fn child(&self, id: NodeId, index: usize) -> Option<NodeId>;
}

impl<C> TreeView for Nodes<C> {
    fn path(&self, id: NodeId) -> Option<&Path> {
        self.get(id).map(|node| node.path())
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent())
    }

    fn is_file(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|node| node.is_file())
    }

    fn has_child_collection(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|node| node.children().is_some())
    }

    fn has_contents(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|node| node.contents().is_some())
    }

    fn length(&self, id: NodeId) -> usize {
        self.get(id).map_or(0, |node| node.length())
    }

    fn child_count(&self, id: NodeId) -> usize {
        Nodes::child_count(self, id)
    }

    fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        Nodes::child(self, id, index).ok()
    }
}

/// Outcome of a whole-tree check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Nodes reached by the walk, or `None` if the walk stopped early.
    pub walked: Option<usize>,
    /// The count the tree claims to hold.
    pub expected: usize,
    pub violations: Vec<Violation>,
}

impl CheckReport {
    /// Returns `true` if no violations were found.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    fn record(&mut self, path: Option<&Path>, kind: ViolationKind, description: String) {
        let path = path.map(|p| p.to_string());
        error!(
            kind = ?kind,
            path = path.as_deref().unwrap_or("-"),
            "{description}"
        );
        self.violations.push(Violation {
            path,
            kind,
            description,
        });
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "tree is valid ({} nodes)", self.expected);
        }
        write!(f, "{} violation(s):", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "\n  {violation}")?;
        }
        Ok(())
    }
}

/// A specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Path of the offending node, when it could be read.
    pub path: Option<String>,
    pub kind: ViolationKind,
    pub description: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{path}: {}", self.description),
            None => f.write_str(&self.description),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingNode,
    ParentPathMismatch,
    ParentLinkMismatch,
    FileHasChildren,
    MissingChildCollection,
    DirectoryHasContents,
    DirectoryHasLength,
    ContentsLengthMismatch,
    OutOfOrder,
    DuplicateSibling,
    ChildCountMismatch,
    UninitializedWithNodes,
    CountMismatch,
}

/// Check the invariants of a single node.
///
/// Returns `false` after recording the first violation found.
pub fn node_is_valid<V: TreeView + ?Sized>(
    view: &V,
    id: NodeId,
    report: &mut CheckReport,
) -> bool {
    let Some(path) = view.path(id) else {
        report.record(
            None,
            ViolationKind::MissingNode,
            format!("node {id} is not live"),
        );
        return false;
    };

    if let Some(parent) = view.parent(id) {
        let Some(parent_path) = view.path(parent) else {
            report.record(
                Some(path),
                ViolationKind::MissingNode,
                format!("parent {parent} is not live"),
            );
            return false;
        };
        let expected = path.depth() - 1;
        if parent_path.depth() != expected || path.shared_prefix_depth(parent_path) != expected {
            report.record(
                Some(path),
                ViolationKind::ParentPathMismatch,
                format!("parent path {parent_path} is not this path minus its last component"),
            );
            return false;
        }
    }

    if view.is_file(id) {
        if view.has_child_collection(id) {
            report.record(
                Some(path),
                ViolationKind::FileHasChildren,
                "file has a child collection".into(),
            );
            return false;
        }
        let has_contents = view.has_contents(id);
        let length = view.length(id);
        if has_contents != (length != 0) {
            report.record(
                Some(path),
                ViolationKind::ContentsLengthMismatch,
                format!("contents present: {has_contents}, length: {length}"),
            );
            return false;
        }
    } else {
        if !view.has_child_collection(id) {
            report.record(
                Some(path),
                ViolationKind::MissingChildCollection,
                "directory has no child collection".into(),
            );
            return false;
        }
        if view.has_contents(id) {
            report.record(
                Some(path),
                ViolationKind::DirectoryHasContents,
                "directory has contents".into(),
            );
            return false;
        }
        let length = view.length(id);
        if length != 0 {
            report.record(
                Some(path),
                ViolationKind::DirectoryHasLength,
                format!("directory has length {length}"),
            );
            return false;
        }
    }

    true
}

/// Walk the subtree at `root` in pre-order, stopping at the first violation.
///
/// Returns the number of nodes visited, or `None` if a violation was
/// recorded. An absent root is an empty, valid tree.
pub fn tree_check<V: TreeView + ?Sized>(
    view: &V,
    root: Option<NodeId>,
    report: &mut CheckReport,
) -> Option<usize> {
    match root {
        Some(root) => walk(view, root, report),
        None => Some(0),
    }
}

/// Children of one node still being checked by [`walk`].
struct Frame {
    id: NodeId,
    next: usize,
    count: usize,
    previous: Option<NodeId>,
}

impl Frame {
    fn new<V: TreeView + ?Sized>(view: &V, id: NodeId) -> Self {
        Self {
            id,
            next: 0,
            count: view.child_count(id),
            previous: None,
        }
    }
}

fn walk<V: TreeView + ?Sized>(view: &V, root: NodeId, report: &mut CheckReport) -> Option<usize> {
    if !node_is_valid(view, root, report) {
        return None;
    }

    let mut visited = 1;
    let mut stack = vec![Frame::new(view, root)];
    while let Some(frame) = stack.last_mut() {
        if frame.next == frame.count {
            stack.pop();
            continue;
        }
        let (id, index, previous) = (frame.id, frame.next, frame.previous);
        let path = view.path(id);

        let Some(child) = view.child(id, index) else {
            report.record(
                path,
                ViolationKind::ChildCountMismatch,
                format!(
                    "claims {} children but child {index} is not retrievable",
                    frame.count
                ),
            );
            return None;
        };
        frame.next += 1;
        frame.previous = Some(child);

        let Some(child_path) = view.path(child) else {
            report.record(
                path,
                ViolationKind::MissingNode,
                format!("child {index} ({child}) is not live"),
            );
            return None;
        };
        if view.parent(child) != Some(id) {
            report.record(
                Some(child_path),
                ViolationKind::ParentLinkMismatch,
                "child does not point back at its parent".into(),
            );
            return None;
        }
        if let Some(previous) = previous.and_then(|previous| view.path(previous)) {
            match previous.compare_path(child_path) {
                Ordering::Less => {}
                Ordering::Equal => {
                    report.record(
                        Some(child_path),
                        ViolationKind::DuplicateSibling,
                        format!("duplicate sibling at index {index}"),
                    );
                    return None;
                }
                Ordering::Greater => {
                    report.record(
                        Some(child_path),
                        ViolationKind::OutOfOrder,
                        format!("sorts before previous sibling {previous}"),
                    );
                    return None;
                }
            }
        }

        if !node_is_valid(view, child, report) {
            return None;
        }
        visited += 1;
        stack.push(Frame::new(view, child));
    }

    Some(visited)
}

/// Check a whole tree against its recorded state.
///
/// The lifecycle rule, the structural walk and the count comparison are
/// reported independently; the count is only compared if the walk finished.
pub fn is_valid<V: TreeView + ?Sized>(
    view: &V,
    initialized: bool,
    root: Option<NodeId>,
    expected: usize,
) -> CheckReport {
    let mut report = CheckReport {
        expected,
        ..Default::default()
    };

    if !initialized && expected != 0 {
        report.record(
            None,
            ViolationKind::UninitializedWithNodes,
            format!("uninitialized tree claims {expected} nodes"),
        );
    }

    if let Some(root) = root {
        if let Some(parent) = view.parent(root) {
            report.record(
                view.path(root),
                ViolationKind::ParentLinkMismatch,
                format!("root has parent {parent}"),
            );
        }
    }

    report.walked = tree_check(view, root, &mut report);
    if let Some(walked) = report.walked {
        if walked != expected {
            report.record(
                None,
                ViolationKind::CountMismatch,
                format!("tree claims {expected} nodes but {walked} are reachable"),
            );
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::node::Entry;

    fn p(s: &str) -> Path {
        Path::new(s).unwrap()
    }

    struct Sample {
        nodes: Nodes<&'static str>,
        ids: HashMap<&'static str, NodeId>,
        /// An id that was handed out and then freed.
        dead: NodeId,
    }

    impl Sample {
        fn id(&self, path: &str) -> NodeId {
            self.ids[path]
        }

        fn root(&self) -> NodeId {
            self.id("/r")
        }
    }

    /// `/r` holding `/r/a` (with `/r/a/x`), the file `/r/b`, and `/r/c`.
    fn sample() -> Sample {
        let mut nodes = Nodes::default();
        let mut ids = HashMap::new();
        let root = nodes.create(&p("/r"), None, Entry::Directory).unwrap();
        ids.insert("/r", root);
        for (path, parent) in [("/r/a", "/r"), ("/r/a/x", "/r/a"), ("/r/c", "/r")] {
            let id = nodes
                .create(&p(path), Some(ids[parent]), Entry::Directory)
                .unwrap();
            ids.insert(path, id);
        }
        let file = Entry::File {
            contents: Some("hello"),
            length: 5,
        };
        ids.insert("/r/b", nodes.create(&p("/r/b"), Some(root), file).unwrap());

        let dead = nodes.create(&p("/r/d"), Some(root), Entry::Directory).unwrap();
        nodes.free(dead);

        Sample { nodes, ids, dead }
    }

    /// A view over a real store with one deliberate corruption.
    enum Fault {
        SwapChildren(NodeId, usize, usize),
        RepeatChild(NodeId, usize),
        InflateChildCount(NodeId),
        WrongParent(NodeId, NodeId),
        DeadChild(NodeId, NodeId),
        FileWithChildren(NodeId),
        DirectoryWithContents(NodeId),
        Length(NodeId, usize),
    }

    struct Faulty<'a> {
        nodes: &'a Nodes<&'static str>,
        fault: Fault,
    }

    impl TreeView for Faulty<'_> {
        fn path(&self, id: NodeId) -> Option<&Path> {
            TreeView::path(self.nodes, id)
        }

        fn parent(&self, id: NodeId) -> Option<NodeId> {
            match self.fault {
                Fault::WrongParent(node, parent) if node == id => Some(parent),
                _ => TreeView::parent(self.nodes, id),
            }
        }

        fn is_file(&self, id: NodeId) -> bool {
            TreeView::is_file(self.nodes, id)
        }

        fn has_child_collection(&self, id: NodeId) -> bool {
            match self.fault {
                Fault::FileWithChildren(node) if node == id => true,
                _ => TreeView::has_child_collection(self.nodes, id),
            }
        }

        fn has_contents(&self, id: NodeId) -> bool {
            match self.fault {
                Fault::DirectoryWithContents(node) if node == id => true,
                _ => TreeView::has_contents(self.nodes, id),
            }
        }

        fn length(&self, id: NodeId) -> usize {
            match self.fault {
                Fault::Length(node, length) if node == id => length,
                _ => TreeView::length(self.nodes, id),
            }
        }

        fn child_count(&self, id: NodeId) -> usize {
            match self.fault {
                Fault::InflateChildCount(node) if node == id => {
                    TreeView::child_count(self.nodes, id) + 1
                }
                _ => TreeView::child_count(self.nodes, id),
            }
        }

        fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
            let index = match self.fault {
                Fault::SwapChildren(node, i, j) if node == id && index == i => j,
                Fault::SwapChildren(node, i, j) if node == id && index == j => i,
                Fault::RepeatChild(node, i) if node == id && index == i + 1 => i,
                Fault::DeadChild(node, dead) if node == id && index == 0 => return Some(dead),
                _ => index,
            };
            TreeView::child(self.nodes, id, index)
        }
    }

    fn check_with(sample: &Sample, fault: Fault) -> CheckReport {
        let view = Faulty {
            nodes: &sample.nodes,
            fault,
        };
        is_valid(&view, true, Some(sample.root()), 5)
    }

    fn kinds(report: &CheckReport) -> Vec<ViolationKind> {
        report.violations.iter().map(|v| v.kind).collect()
    }

    // -----------------------------------------------------------------------
    // Valid trees
    // -----------------------------------------------------------------------

    #[test]
    fn valid_tree_passes() {
        let s = sample();
        let report = is_valid(&s.nodes, true, Some(s.root()), 5);
        assert!(report.is_valid(), "{report}");
        assert_eq!(report.walked, Some(5));
    }

    #[test]
    fn empty_tree_is_valid() {
        let nodes: Nodes<()> = Nodes::default();
        assert!(is_valid(&nodes, true, None, 0).is_valid());
        assert!(is_valid(&nodes, false, None, 0).is_valid());
        assert_eq!(tree_check(&nodes, None, &mut CheckReport::default()), Some(0));
    }

    #[test]
    fn tree_check_counts_subtree() {
        let s = sample();
        let mut report = CheckReport::default();
        assert_eq!(tree_check(&s.nodes, Some(s.id("/r/a")), &mut report), Some(2));
        assert!(report.is_valid());
    }

    // -----------------------------------------------------------------------
    // Count and lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn count_mismatch_on_sound_structure() {
        let s = sample();
        let report = is_valid(&s.nodes, true, Some(s.root()), 4);
        assert_eq!(kinds(&report), vec![ViolationKind::CountMismatch]);
        assert_eq!(report.walked, Some(5));
    }

    #[test]
    fn uninitialized_with_count_is_reported_independently() {
        let s = sample();
        let report = is_valid(&s.nodes, false, Some(s.root()), 4);
        assert_eq!(
            kinds(&report),
            vec![
                ViolationKind::UninitializedWithNodes,
                ViolationKind::CountMismatch
            ]
        );
    }

    #[test]
    fn root_with_parent_is_rejected() {
        let s = sample();
        let report = is_valid(&s.nodes, true, Some(s.id("/r/a")), 2);
        assert_eq!(kinds(&report), vec![ViolationKind::ParentLinkMismatch]);
    }

    // -----------------------------------------------------------------------
    // Structural corruption
    // -----------------------------------------------------------------------

    #[test]
    fn out_of_order_siblings() {
        let s = sample();
        let report = check_with(&s, Fault::SwapChildren(s.root(), 0, 2));
        assert_eq!(kinds(&report), vec![ViolationKind::OutOfOrder]);
        assert_eq!(report.walked, None);
    }

    #[test]
    fn duplicate_siblings() {
        let s = sample();
        let report = check_with(&s, Fault::RepeatChild(s.root(), 0));
        assert_eq!(kinds(&report), vec![ViolationKind::DuplicateSibling]);
    }

    #[test]
    fn unretrievable_child() {
        let s = sample();
        let report = check_with(&s, Fault::InflateChildCount(s.root()));
        assert_eq!(kinds(&report), vec![ViolationKind::ChildCountMismatch]);
    }

    #[test]
    fn dangling_child() {
        let s = sample();
        let report = check_with(&s, Fault::DeadChild(s.id("/r/a"), s.dead));
        assert_eq!(kinds(&report), vec![ViolationKind::MissingNode]);
    }

    #[test]
    fn dead_node() {
        let s = sample();
        let mut report = CheckReport::default();
        assert!(!node_is_valid(&s.nodes, s.dead, &mut report));
        assert_eq!(kinds(&report), vec![ViolationKind::MissingNode]);
        assert!(report.violations[0].path.is_none());
    }

    #[test]
    fn parent_path_mismatch() {
        let s = sample();
        let x = s.id("/r/a/x");
        for parent in [s.id("/r/c"), s.root()] {
            let view = Faulty {
                nodes: &s.nodes,
                fault: Fault::WrongParent(x, parent),
            };
            let mut report = CheckReport::default();
            assert!(!node_is_valid(&view, x, &mut report));
            assert_eq!(kinds(&report), vec![ViolationKind::ParentPathMismatch]);
        }
    }

    #[test]
    fn child_not_pointing_back() {
        let s = sample();
        let report = check_with(&s, Fault::WrongParent(s.id("/r/c"), s.id("/r/a")));
        assert_eq!(kinds(&report), vec![ViolationKind::ParentLinkMismatch]);
        assert_eq!(report.violations[0].path.as_deref(), Some("/r/c"));
    }

    // -----------------------------------------------------------------------
    // Node shape
    // -----------------------------------------------------------------------

    #[test]
    fn file_with_children() {
        let s = sample();
        let report = check_with(&s, Fault::FileWithChildren(s.id("/r/b")));
        assert_eq!(kinds(&report), vec![ViolationKind::FileHasChildren]);
    }

    #[test]
    fn directory_with_contents_or_length() {
        let s = sample();
        let c = s.id("/r/c");

        let report = check_with(&s, Fault::DirectoryWithContents(c));
        assert_eq!(kinds(&report), vec![ViolationKind::DirectoryHasContents]);

        let report = check_with(&s, Fault::Length(c, 3));
        assert_eq!(kinds(&report), vec![ViolationKind::DirectoryHasLength]);
    }

    #[test]
    fn contents_and_length_must_agree() {
        let s = sample();
        let report = check_with(&s, Fault::Length(s.id("/r/b"), 0));
        assert_eq!(kinds(&report), vec![ViolationKind::ContentsLengthMismatch]);

        let mut nodes = Nodes::default();
        let root = nodes.create(&p("/r"), None, Entry::Directory).unwrap();
        let empty_with_length = Entry::File {
            contents: None::<&str>,
            length: 4,
        };
        nodes.create(&p("/r/f"), Some(root), empty_with_length).unwrap();
        let report = is_valid(&nodes, true, Some(root), 2);
        assert_eq!(kinds(&report), vec![ViolationKind::ContentsLengthMismatch]);
    }

    #[test]
    fn report_display_lists_violations() {
        let s = sample();
        let text = is_valid(&s.nodes, true, Some(s.root()), 9).to_string();
        assert!(text.starts_with("1 violation(s):"));
        assert!(text.contains("claims 9 nodes but 5 are reachable"));
        assert_eq!(
            is_valid(&s.nodes, true, Some(s.root()), 5).to_string(),
            "tree is valid (5 nodes)"
        );
    }
}
