//! Cursor translation: turns a `since` marker and a direction into a
//! predicate over one of the three post sort keys.

use std::cmp::Ordering;

use crate::models::{Post, PostId};
use crate::path::PostPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn from_desc(desc: bool) -> Self {
        if desc {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    /// Orients an ascending comparison for this direction.
    pub fn orient(self, ord: Ordering) -> Ordering {
        match self {
            Self::Asc => ord,
            Self::Desc => ord.reverse(),
        }
    }
}

/// Column a predicate compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// The post identifier
    Id,
    /// The full materialized path
    Path,
    /// The first path element, i.e. the root ancestor
    Root,
}

/// A `since` marker resolved against storage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Since {
    #[default]
    Unbounded,
    /// `path` is the stored path of post `id`, or `None` if no such post exists.
    Post { id: PostId, path: Option<PostPath> },
}

impl Since {
    /// Zero or negative markers mean "from the beginning".
    pub fn is_unbounded_marker(raw: PostId) -> bool {
        raw <= 0
    }

    pub fn resolved(raw: PostId, path: Option<PostPath>) -> Self {
        if Self::is_unbounded_marker(raw) {
            Self::Unbounded
        } else {
            Self::Post { id: raw, path }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Bound {
    Open,
    /// The cursor names a post that does not exist; nothing qualifies.
    Closed,
    Id(PostId),
    Path(PostPath),
}

/// Comparison condition produced by [`CursorPredicate::translate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPredicate {
    key: SortKey,
    direction: Direction,
    bound: Bound,
}

impl CursorPredicate {
    /// Builds the predicate for `key`:
    ///
    /// * `Id`:   `id > since` ascending, `id < since` descending
    /// * `Path`: `path > path(since)` / `path < path(since)`
    /// * `Root`: `path[0] > path(since)[0]` / `path[0] < path(since)[0]`
    ///
    /// An unbounded `since` admits every post.
    pub fn translate(key: SortKey, since: &Since, direction: Direction) -> Self {
        let bound = match since {
            Since::Unbounded => Bound::Open,
            Since::Post { id, path } => match key {
                SortKey::Id => Bound::Id(*id),
                SortKey::Path => path.clone().map_or(Bound::Closed, Bound::Path),
                SortKey::Root => path.as_ref().map_or(Bound::Closed, |p| Bound::Id(p.root_id())),
            },
        };
        Self { key, direction, bound }
    }

    pub fn is_open(&self) -> bool {
        self.bound == Bound::Open
    }

    pub fn admits(&self, post: &Post) -> bool {
        let ord = match (&self.bound, self.key) {
            (Bound::Open, _) => return true,
            (Bound::Closed, _) => return false,
            (Bound::Id(since), SortKey::Id) => post.id.cmp(since),
            (Bound::Id(since), SortKey::Root) => post.path.root_id().cmp(since),
            (Bound::Path(since), SortKey::Path) => post.path.cmp(since),
            // translate() never pairs a path bound with a scalar key or vice versa
            (Bound::Id(_), SortKey::Path) | (Bound::Path(_), _) => return false,
        };
        self.direction.orient(ord) == Ordering::Greater
    }
}
