//! # Repository Ports
//!
//! Any storage adapter must implement these traits to be used by the services.
//! Lookups return `Ok(None)` for a missing row; uniqueness violations surface as
//! [`DomainError::Conflict`](crate::DomainError::Conflict).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::cursor::Direction;
use crate::errors::DomainResult;
use crate::models::{
    Forum, NewForum, NewPost, NewThread, Post, PostId, ServiceStatus, Thread, ThreadId, ThreadRef,
    ThreadUpdate, User, UserUpdate, Vote,
};
use crate::pagination::PageSize;

/// Listing parameters for a forum's participants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListQuery {
    pub size: PageSize,
    /// Exclusive nickname bound, compared case-insensitively
    pub since: Option<String>,
    pub direction: Direction,
}

/// Listing parameters for a forum's threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadListQuery {
    pub size: PageSize,
    /// Inclusive creation-time bound
    pub since: Option<DateTime<Utc>>,
    pub direction: Direction,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the nickname or email is taken.
    async fn insert_user(&self, user: &User) -> DomainResult<()>;
    async fn find_user(&self, nickname: &str) -> DomainResult<Option<User>>;
    /// Every user whose nickname or email collides with the given ones.
    async fn find_conflicting_users(&self, nickname: &str, email: &str) -> DomainResult<Vec<User>>;
    /// Fails with `Conflict` when the new email belongs to someone else.
    async fn update_user(&self, nickname: &str, update: &UserUpdate) -> DomainResult<Option<User>>;
    /// Users who created a thread or post in the forum, ordered by nickname.
    async fn list_forum_users(&self, forum: &str, query: &UserListQuery) -> DomainResult<Vec<User>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ForumRepository: Send + Sync {
    /// `owner` is the canonical nickname of an existing user.
    async fn insert_forum(&self, forum: &NewForum, owner: &str) -> DomainResult<Forum>;
    async fn find_forum(&self, slug: &str) -> DomainResult<Option<Forum>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Creates the thread, bumps the forum's counter and records the author
    /// as a forum participant, atomically.
    async fn insert_thread(
        &self,
        forum: &Forum,
        author: &str,
        thread: &NewThread,
        created: DateTime<Utc>,
    ) -> DomainResult<Thread>;
    async fn find_thread(&self, thread: &ThreadRef) -> DomainResult<Option<Thread>>;
    async fn list_forum_threads(&self, forum: &str, query: &ThreadListQuery) -> DomainResult<Vec<Thread>>;
    async fn update_thread(&self, id: ThreadId, update: &ThreadUpdate) -> DomainResult<Option<Thread>>;
    /// Inserts or replaces the voice and returns the thread with its new tally.
    async fn upsert_vote(&self, vote: &Vote) -> DomainResult<Thread>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Inserts the whole batch in one atomic unit, assigning identifiers and
    /// paths in input order. Authors must already be canonical nicknames.
    /// A parent that is missing or lives in another thread rejects the batch
    /// with `Conflict`; nothing is persisted in that case.
    async fn insert_posts(
        &self,
        thread: &Thread,
        posts: &[NewPost],
        created: DateTime<Utc>,
    ) -> DomainResult<Vec<Post>>;
    async fn find_post(&self, id: PostId) -> DomainResult<Option<Post>>;
    /// All posts of a thread, in no particular order.
    async fn thread_posts(&self, thread: ThreadId) -> DomainResult<Vec<Post>>;
    /// Replaces the message and marks the post edited.
    async fn update_post_message(&self, id: PostId, message: &str) -> DomainResult<Option<Post>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn status(&self) -> DomainResult<ServiceStatus>;
    /// Removes every row of every table.
    async fn clear(&self) -> DomainResult<()>;
}
