//! Threads and the votes cast on them.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    CreateOutcome, DomainError, DomainResult, ForumRepository, NewThread, NewVote, Thread,
    ThreadListQuery, ThreadRef, ThreadRepository, ThreadUpdate, UserRepository, Vote,
};
use tracing::{info, instrument};

#[derive(Clone)]
pub struct ThreadService {
    threads: Arc<dyn ThreadRepository>,
    forums: Arc<dyn ForumRepository>,
    users: Arc<dyn UserRepository>,
}

impl ThreadService {
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        forums: Arc<dyn ForumRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self { threads, forums, users }
    }

    /// Opens a thread in `forum`. A taken slug yields the thread that holds it.
    #[instrument(skip(self, thread), fields(slug = ?thread.slug()))]
    pub async fn create(&self, forum: &str, thread: NewThread) -> DomainResult<CreateOutcome<Thread>> {
        let forum = self
            .forums
            .find_forum(forum)
            .await?
            .ok_or_else(|| DomainError::not_found("forum", forum))?;
        let author = self
            .users
            .find_user(&thread.author)
            .await?
            .ok_or_else(|| DomainError::not_found("user", &thread.author))?;

        let created = thread.created.unwrap_or_else(Utc::now);
        match self.threads.insert_thread(&forum, &author.nickname, &thread, created).await {
            Ok(stored) => {
                info!(thread = stored.id, forum = %stored.forum, "thread created");
                Ok(CreateOutcome::Created(stored))
            }
            Err(DomainError::Conflict(reason)) => {
                let Some(slug) = thread.slug() else {
                    return Err(DomainError::Conflict(reason));
                };
                match self.threads.find_thread(&ThreadRef::Slug(slug.to_string())).await? {
                    Some(existing) => Ok(CreateOutcome::AlreadyExists(existing)),
                    None => Err(DomainError::Conflict(reason)),
                }
            }
            Err(e) => Err(e),
        }
    }

    pub async fn forum_threads(&self, forum: &str, query: &ThreadListQuery) -> DomainResult<Vec<Thread>> {
        let forum = self
            .forums
            .find_forum(forum)
            .await?
            .ok_or_else(|| DomainError::not_found("forum", forum))?;
        self.threads.list_forum_threads(&forum.slug, query).await
    }

    pub async fn details(&self, thread: &ThreadRef) -> DomainResult<Thread> {
        self.threads
            .find_thread(thread)
            .await?
            .ok_or_else(|| DomainError::not_found("thread", thread))
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, thread: &ThreadRef, update: ThreadUpdate) -> DomainResult<Thread> {
        let current = self.details(thread).await?;
        let update = update.normalized();
        if update.title.is_none() && update.message.is_none() {
            return Ok(current);
        }
        self.threads
            .update_thread(current.id, &update)
            .await?
            .ok_or_else(|| DomainError::not_found("thread", thread))
    }

    /// Records `vote` (replacing an earlier one by the same user) and returns
    /// the thread with its recomputed tally.
    #[instrument(skip(self, vote), fields(nickname = %vote.nickname, voice = vote.voice))]
    pub async fn vote(&self, thread: &ThreadRef, vote: NewVote) -> DomainResult<Thread> {
        if vote.voice != 1 && vote.voice != -1 {
            return Err(DomainError::InvalidArgument(format!(
                "voice must be 1 or -1, got {}",
                vote.voice
            )));
        }
        let voter = self
            .users
            .find_user(&vote.nickname)
            .await?
            .ok_or_else(|| DomainError::not_found("user", &vote.nickname))?;
        let target = self.details(thread).await?;

        self.threads
            .upsert_vote(&Vote { nickname: voter.nickname, thread: target.id, voice: vote.voice })
            .await
    }
}
