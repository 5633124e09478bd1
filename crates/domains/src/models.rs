//! # Domain Models
//!
//! These structs represent the core entities of the forum service.
//! Identifiers are database-assigned integers; posts additionally carry a
//! materialized ancestry path (see [`crate::path`]).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::path::PostPath;

pub type ThreadId = i32;
pub type PostId = i64;

/// A registered forum member. The nickname is the case-insensitive key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub nickname: String,
    pub fullname: String,
    pub about: String,
    pub email: String,
}

/// A top-level discussion space (e.g. "rust-lang").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forum {
    /// The URL slug, unique case-insensitively
    pub slug: String,
    pub title: String,
    /// Nickname of the owner
    pub user: String,
    pub posts: i64,
    pub threads: i32,
}

/// A Thread contains a tree of Posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    /// Optional human-readable handle, unique case-insensitively
    pub slug: Option<String>,
    pub title: String,
    pub author: String,
    pub forum: String,
    pub message: String,
    /// Sum of all vote voices
    pub votes: i32,
    pub created: DateTime<Utc>,
}

/// The fundamental unit of conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    /// `None` for a root post
    pub parent: Option<PostId>,
    pub author: String,
    pub message: String,
    pub is_edited: bool,
    /// Denormalized from the owning thread
    pub forum: String,
    pub thread: ThreadId,
    pub created: DateTime<Utc>,
    #[serde(skip)]
    pub path: PostPath,
}

impl Post {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// One user's opinion of a thread. `(nickname, thread)` is the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub nickname: String,
    pub thread: ThreadId,
    pub voice: i32,
}

// ── Inputs ──────────────────────────────────────────────────────────────────

/// Profile fields for a new user; the nickname comes from the route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub email: String,
}

impl NewUser {
    pub fn into_user(self, nickname: impl Into<String>) -> User {
        User {
            nickname: nickname.into(),
            fullname: self.fullname,
            about: self.about,
            email: self.email,
        }
    }
}

/// Partial profile update. Missing or empty fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub fullname: Option<String>,
    pub about: Option<String>,
    pub email: Option<String>,
}

impl UserUpdate {
    /// Drops empty strings so adapters only ever see real changes.
    pub fn normalized(self) -> Self {
        Self {
            fullname: non_empty(self.fullname),
            about: non_empty(self.about),
            email: non_empty(self.email),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fullname.is_none() && self.about.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewForum {
    pub slug: String,
    pub title: String,
    /// Owner nickname, any case
    pub user: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewThread {
    #[serde(default)]
    pub slug: Option<String>,
    pub title: String,
    pub author: String,
    pub message: String,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl NewThread {
    /// An empty slug means "no slug".
    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadUpdate {
    pub title: Option<String>,
    pub message: Option<String>,
}

impl ThreadUpdate {
    pub fn normalized(self) -> Self {
        Self {
            title: non_empty(self.title),
            message: non_empty(self.message),
        }
    }
}

/// A post as submitted by a client, before identifier and path assignment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub parent: Option<PostId>,
    pub author: String,
    pub message: String,
}

impl NewPost {
    /// Declared parent; `0` is how clients spell "no parent".
    pub fn parent_id(&self) -> Option<PostId> {
        self.parent.filter(|&id| id != 0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVote {
    pub nickname: String,
    pub voice: i32,
}

// ── Lookups ─────────────────────────────────────────────────────────────────

/// How a client names a thread in a route: numeric id or slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadRef {
    Id(ThreadId),
    Slug(String),
}

impl ThreadRef {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<ThreadId>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Slug(raw.to_string()),
        }
    }
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Slug(slug) => f.write_str(slug),
        }
    }
}

/// Entities that can be embedded next to a post in its details view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Related {
    User,
    Thread,
    Forum,
}

impl FromStr for Related {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "thread" => Ok(Self::Thread),
            "forum" => Ok(Self::Forum),
            other => Err(DomainError::InvalidArgument(format!("unknown related entity: {other}"))),
        }
    }
}

impl Related {
    /// Parses `user,thread,...`, skipping blanks and unknown names.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut out = Vec::new();
        for item in raw.split(',').map(str::trim) {
            if let Ok(related) = item.parse::<Self>() {
                if !out.contains(&related) {
                    out.push(related);
                }
            }
        }
        out
    }
}

/// A post together with whichever related entities were asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDetails {
    pub post: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forum: Option<Forum>,
}

/// Row counts reported by the service status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub user: i64,
    pub forum: i64,
    pub thread: i64,
    pub post: i64,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
