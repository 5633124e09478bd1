//! # Post listing strategies
//!
//! A thread's posts can be listed three ways:
//!
//! * **flat**: by identifier, i.e. creation order
//! * **tree**: depth-first by materialized path
//! * **parent_tree**: a page is a number of *top-level* posts, each returned
//!   together with its entire subtree
//!
//! Every strategy takes the thread's posts in any order and returns the
//! requested page. Ordering is computed here with [`PostPath`]'s own
//! comparison so no storage engine has to know how to sort arrays.

use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::cursor::{CursorPredicate, Direction, Since, SortKey};
use crate::errors::DomainError;
use crate::models::{Post, PostId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Flat,
    Tree,
    ParentTree,
}

impl SortMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Tree => "tree",
            Self::ParentTree => "parent_tree",
        }
    }

    /// The key the cursor is compared against in this mode.
    pub fn sort_key(self) -> SortKey {
        match self {
            Self::Flat => SortKey::Id,
            Self::Tree => SortKey::Path,
            Self::ParentTree => SortKey::Root,
        }
    }

    /// Whether the cursor post's stored path must be looked up.
    pub fn needs_cursor_path(self) -> bool {
        self.sort_key() != SortKey::Id
    }

    pub fn strategy(self) -> &'static dyn SortStrategy {
        match self {
            Self::Flat => &Flat,
            Self::Tree => &Tree,
            Self::ParentTree => &ParentTree,
        }
    }
}

impl FromStr for SortMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Self::Flat),
            "tree" => Ok(Self::Tree),
            "parent_tree" => Ok(Self::ParentTree),
            other => Err(DomainError::InvalidArgument(format!("unknown sort mode: {other}"))),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page size. A non-positive client limit means "no limit".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageSize(Option<usize>);

impl PageSize {
    pub const UNBOUNDED: Self = Self(None);

    pub fn from_limit(limit: i64) -> Self {
        if limit <= 0 {
            Self(None)
        } else {
            Self(Some(usize::try_from(limit).unwrap_or(usize::MAX)))
        }
    }

    pub fn get(self) -> Option<usize> {
        self.0
    }

    fn truncate<T>(self, items: &mut Vec<T>) {
        if let Some(n) = self.0 {
            items.truncate(n);
        }
    }
}

/// Everything a strategy needs besides the posts themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub size: PageSize,
    pub since: Since,
    pub direction: Direction,
}

pub trait SortStrategy: Send + Sync {
    fn mode(&self) -> SortMode;

    /// Orders, filters and truncates `posts`, which must all belong to one thread.
    fn page(&self, posts: Vec<Post>, request: &PageRequest) -> Vec<Post>;

    fn predicate(&self, request: &PageRequest) -> CursorPredicate {
        CursorPredicate::translate(self.mode().sort_key(), &request.since, request.direction)
    }
}

pub struct Flat;

impl SortStrategy for Flat {
    fn mode(&self) -> SortMode {
        SortMode::Flat
    }

    fn page(&self, posts: Vec<Post>, request: &PageRequest) -> Vec<Post> {
        let predicate = self.predicate(request);
        let mut page: Vec<Post> = posts.into_iter().filter(|p| predicate.admits(p)).collect();
        page.sort_by(|a, b| request.direction.orient(a.id.cmp(&b.id)));
        request.size.truncate(&mut page);
        page
    }
}

pub struct Tree;

impl SortStrategy for Tree {
    fn mode(&self) -> SortMode {
        SortMode::Tree
    }

    fn page(&self, posts: Vec<Post>, request: &PageRequest) -> Vec<Post> {
        let predicate = self.predicate(request);
        let mut page: Vec<Post> = posts.into_iter().filter(|p| predicate.admits(p)).collect();
        page.sort_by(|a, b| request.direction.orient(tree_order(a, b)));
        request.size.truncate(&mut page);
        page
    }
}

pub struct ParentTree;

impl SortStrategy for ParentTree {
    fn mode(&self) -> SortMode {
        SortMode::ParentTree
    }

    fn page(&self, posts: Vec<Post>, request: &PageRequest) -> Vec<Post> {
        let predicate = self.predicate(request);

        // The limit and cursor apply to top-level posts only.
        let mut roots: Vec<PostId> = posts
            .iter()
            .filter(|p| p.is_root() && predicate.admits(p))
            .map(|p| p.id)
            .collect();
        roots.sort_by(|a, b| request.direction.orient(a.cmp(b)));
        request.size.truncate(&mut roots);
        let selected: HashSet<PostId> = roots.into_iter().collect();

        let mut page: Vec<Post> =
            posts.into_iter().filter(|p| selected.contains(&p.path.root_id())).collect();
        match request.direction {
            Direction::Asc => page.sort_by(tree_order),
            // Newest subtrees first, each one still read top-down.
            Direction::Desc => page.sort_by(|a, b| {
                (Reverse(a.path.root_id()), &a.path, a.id)
                    .cmp(&(Reverse(b.path.root_id()), &b.path, b.id))
            }),
        }
        page
    }
}

/// `(path, id)` ascending.
fn tree_order(a: &Post, b: &Post) -> Ordering {
    a.path.cmp(&b.path).then_with(|| a.id.cmp(&b.id))
}
