use serde::{Deserialize, Serialize};

/// When the whole-tree invariant check runs around each mutation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyMode {
    /// Never verify.
    Off,
    /// Verify only in builds with `debug_assertions`.
    #[default]
    Debug,
    /// Verify on every mutation regardless of build profile.
    Always,
}

impl VerifyMode {
    /// Whether verification runs in the current build.
    pub fn is_enabled(self) -> bool {
        match self {
            Self::Off => false,
            Self::Debug => cfg!(debug_assertions),
            Self::Always => true,
        }
    }
}

/// Configuration for a [`FileTree`](crate::FileTree).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// When to run the invariant checker around mutations.
    pub verify: VerifyMode,
    /// Maximum number of live nodes. Creating a node past the limit fails
    /// with a memory error, the same as a failed allocation.
    pub node_limit: Option<usize>,
    /// Initial capacity of each directory's child sequence.
    pub child_capacity: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            verify: VerifyMode::Debug,
            node_limit: None,
            child_capacity: 0,
        }
    }
}

impl TreeConfig {
    /// A configuration that verifies the tree after every mutation.
    pub fn verified() -> Self {
        Self {
            verify: VerifyMode::Always,
            ..Default::default()
        }
    }

    /// Cap the number of live nodes.
    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = Some(limit);
        self
    }
}
