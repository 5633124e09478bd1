//! # Materialized paths
//!
//! Every post stores the identifiers of its ancestors, root first, ending with
//! its own identifier. Sorting by this sequence yields a depth-first walk of
//! the comment tree without any recursive query.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::models::{PostId, ThreadId};

/// Ancestry of a post: `[root, ..., parent, self]`. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<PostId>", into = "Vec<PostId>")]
pub struct PostPath(Vec<PostId>);

impl PostPath {
    /// Path of a post with no parent.
    pub fn root(id: PostId) -> Self {
        Self(vec![id])
    }

    /// Path of `id` once attached below `parent` (or at the top when `None`).
    pub fn derive(parent: Option<&PostPath>, id: PostId) -> Self {
        match parent {
            Some(parent) => {
                let mut ids = Vec::with_capacity(parent.0.len() + 1);
                ids.extend_from_slice(&parent.0);
                ids.push(id);
                Self(ids)
            }
            None => Self::root(id),
        }
    }

    /// Rebuilds a path read back from storage.
    pub fn from_stored(ids: Vec<PostId>) -> DomainResult<Self> {
        if ids.is_empty() {
            return Err(DomainError::Internal("stored post path is empty".into()));
        }
        Ok(Self(ids))
    }

    /// Identifier of the top-level post this path descends from.
    pub fn root_id(&self) -> PostId {
        self.0[0]
    }

    /// Identifier of the post this path belongs to.
    pub fn leaf_id(&self) -> PostId {
        self.0[self.0.len() - 1]
    }

    /// Identifier of the direct parent, if any.
    pub fn parent_id(&self) -> Option<PostId> {
        self.0.len().checked_sub(2).map(|i| self.0[i])
    }

    /// Number of elements; a root post has depth 1.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// True when `self` is a strict prefix of `other`.
    pub fn is_ancestor_of(&self, other: &PostPath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    pub fn as_slice(&self) -> &[PostId] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<PostId> {
        self.0
    }
}

/// Component-wise comparison, then the shorter path first, so a node always
/// sorts before each of its descendants.
impl Ord for PostPath {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

impl PartialOrd for PostPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<Vec<PostId>> for PostPath {
    type Error = DomainError;

    fn try_from(ids: Vec<PostId>) -> DomainResult<Self> {
        Self::from_stored(ids)
    }
}

impl From<PostPath> for Vec<PostId> {
    fn from(path: PostPath) -> Self {
        path.0
    }
}

impl fmt::Display for PostPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// The stored facts about a would-be parent that insertion has to check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub thread: ThreadId,
    pub path: PostPath,
}

/// Resolves the path for a new post in `thread`.
///
/// `parent` is what the caller declared, `found` is what storage returned for
/// that identifier. A missing parent or one living in another thread is a
/// conflict, never a silent fallback to a root post.
pub fn path_for_new_post(
    thread: ThreadId,
    id: PostId,
    parent: Option<PostId>,
    found: Option<&ParentRef>,
) -> DomainResult<PostPath> {
    let Some(parent_id) = parent else {
        return Ok(PostPath::root(id));
    };
    match found {
        Some(p) if p.thread == thread => Ok(PostPath::derive(Some(&p.path), id)),
        Some(p) => Err(DomainError::Conflict(format!(
            "parent post {parent_id} belongs to thread {}, not {thread}",
            p.thread
        ))),
        None => Err(DomainError::Conflict(format!(
            "parent post {parent_id} does not exist in thread {thread}"
        ))),
    }
}
