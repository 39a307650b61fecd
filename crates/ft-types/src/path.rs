//! Absolute hierarchical paths.
//!
//! Valid paths:
//! - Must be non-empty and start with `/`
//! - Components are separated by exactly one `/`
//! - Must not end with `/` (so `/` alone is rejected)
//! - Components must not be `.` or `..`
//! - Must not contain NUL or newline characters
//!
//! Paths order component by component, so `/a/b` sorts before `/a-b` even
//! though `'-'` is smaller than `'/'` as a byte.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PathError, PathResult};

/// Characters that are forbidden anywhere in a path.
///
/// A newline would make the one-path-per-line tree listing ambiguous.
const FORBIDDEN_CHARS: &[char] = &['\0', '\n'];

/// Components with special meaning on real filesystems.
const RESERVED_COMPONENTS: &[&str] = &[".", ".."];

/// A validated absolute path such as `/usr/lib/libc.so`.
///
/// The pathname is kept verbatim alongside the byte offset where each
/// component ends, so prefixes and component iteration never re-parse.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    pathname: String,
    /// `ends[i]` is the byte offset one past the last byte of component `i`.
    ends: Vec<usize>,
}

impl Path {
    /// Parse and validate a path string.
    ///
    /// # Examples
    ///
    /// ```
    /// use ft_types::Path;
    ///
    /// let path = Path::new("/a/b/c.txt").unwrap();
    /// assert_eq!(path.depth(), 3);
    /// assert!(Path::new("a/b").is_err());
    /// assert!(Path::new("/a//b").is_err());
    /// ```
    pub fn new(pathname: &str) -> PathResult<Self> {
        if pathname.is_empty() {
            return Err(PathError::Empty);
        }

        for ch in FORBIDDEN_CHARS {
            if pathname.contains(*ch) {
                return Err(PathError::ForbiddenChar {
                    path: pathname.to_string(),
                    ch: *ch,
                });
            }
        }

        let Some(rest) = pathname.strip_prefix('/') else {
            return Err(PathError::NotAbsolute(pathname.to_string()));
        };
        if rest.is_empty() {
            return Err(PathError::NoComponents(pathname.to_string()));
        }

        let mut ends = Vec::new();
        let mut offset = 1;
        for component in rest.split('/') {
            if component.is_empty() {
                return Err(PathError::EmptyComponent(pathname.to_string()));
            }
            if RESERVED_COMPONENTS.contains(&component) {
                return Err(PathError::ReservedComponent {
                    path: pathname.to_string(),
                    component: component.to_string(),
                });
            }
            offset += component.len();
            ends.try_reserve(1).map_err(|_| PathError::Alloc)?;
            ends.push(offset);
            // skip the separator
            offset += 1;
        }

        let mut owned = String::new();
        owned
            .try_reserve_exact(pathname.len())
            .map_err(|_| PathError::Alloc)?;
        owned.push_str(pathname);

        Ok(Self {
            pathname: owned,
            ends,
        })
    }

    /// Duplicate this path, reporting allocation failure instead of aborting.
    pub fn try_clone(&self) -> PathResult<Self> {
        self.sliced(self.depth())
    }

    /// Number of components. Always at least 1.
    pub fn depth(&self) -> usize {
        self.ends.len()
    }

    /// The path truncated to its first `level` components.
    ///
    /// `level` must be in `1..=depth()`.
    pub fn prefix(&self, level: usize) -> PathResult<Self> {
        if level == 0 || level > self.depth() {
            return Err(PathError::PrefixOutOfRange {
                level,
                depth: self.depth(),
            });
        }
        self.sliced(level)
    }

    fn sliced(&self, level: usize) -> PathResult<Self> {
        let end = self.ends[level - 1];

        let mut pathname = String::new();
        pathname
            .try_reserve_exact(end)
            .map_err(|_| PathError::Alloc)?;
        pathname.push_str(&self.pathname[..end]);

        let mut ends = Vec::new();
        ends.try_reserve_exact(level)
            .map_err(|_| PathError::Alloc)?;
        ends.extend_from_slice(&self.ends[..level]);

        Ok(Self { pathname, ends })
    }

    /// Iterate over the component names, outermost first.
    pub fn components(&self) -> impl Iterator<Item = &str> + '_ {
        let mut start = 1;
        self.ends.iter().map(move |&end| {
            let component = &self.pathname[start..end];
            start = end + 1;
            component
        })
    }

    /// Count of leading components this path shares with `other`.
    pub fn shared_prefix_depth(&self, other: &Path) -> usize {
        self.components()
            .zip(other.components())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Three-way comparison, component by component.
    pub fn compare_path(&self, other: &Path) -> Ordering {
        self.components().cmp(other.components())
    }

    /// Three-way comparison against a raw pathname, component by component.
    ///
    /// The string is not validated; it is split on `/` after its leading
    /// separator, which gives the same answer as [`compare_path`] for any
    /// string [`Path::new`] would accept.
    ///
    /// [`compare_path`]: Path::compare_path
    pub fn compare_str(&self, other: &str) -> Ordering {
        let other = other.strip_prefix('/').unwrap_or(other);
        self.components().cmp(other.split('/'))
    }

    /// The full pathname.
    pub fn as_str(&self) -> &str {
        &self.pathname
    }

    /// Length of the pathname in bytes.
    pub fn str_len(&self) -> usize {
        self.pathname.len()
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_path(other)
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({})", self.pathname)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pathname)
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        &self.pathname
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Path {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl TryFrom<&str> for Path {
    type Error = PathError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.pathname
    }
}
