//! # In-memory store
//!
//! Implements every repository port over plain collections behind one
//! `RwLock`. Holding the write lock for a whole operation gives the same
//! all-or-nothing behaviour a database transaction gives the Postgres store:
//! batch inserts stage their rows and only publish them once every row has
//! been validated.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    path_for_new_post, Direction, DomainError, DomainResult, Forum, ForumRepository, NewForum,
    NewPost, NewThread, ParentRef, Post, PostId, PostRepository, ServiceRepository, ServiceStatus,
    Thread, ThreadId, ThreadListQuery, ThreadRef, ThreadRepository, ThreadUpdate, User,
    UserListQuery, UserRepository, UserUpdate, Vote,
};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct State {
    /// Keyed by lowercase nickname
    users: HashMap<String, User>,
    /// Keyed by lowercase slug
    forums: HashMap<String, Forum>,
    /// Thread `n` lives at index `n - 1`
    threads: Vec<Thread>,
    /// Post `n` lives at index `n - 1`
    posts: Vec<Post>,
    votes: HashMap<(String, ThreadId), i32>,
    /// Lowercase forum slug to lowercase nicknames of its participants
    participants: HashMap<String, BTreeSet<String>>,
}

impl State {
    fn thread_index(&self, thread: &ThreadRef) -> Option<usize> {
        match thread {
            ThreadRef::Id(id) => {
                let idx = usize::try_from(*id).ok()?.checked_sub(1)?;
                (idx < self.threads.len()).then_some(idx)
            }
            ThreadRef::Slug(slug) => self.threads.iter().position(|t| {
                t.slug.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(slug))
            }),
        }
    }

    fn post(&self, id: PostId) -> Option<&Post> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.posts.get(idx)
    }

    fn join_forum(&mut self, forum: &str, nickname: &str) {
        self.participants
            .entry(forum.to_lowercase())
            .or_default()
            .insert(nickname.to_lowercase());
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: &User) -> DomainResult<()> {
        let mut state = self.state.write().await;
        let key = user.nickname.to_lowercase();
        if state.users.contains_key(&key) {
            return Err(DomainError::Conflict(format!("nickname {} is taken", user.nickname)));
        }
        if state.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(DomainError::Conflict(format!("email {} is taken", user.email)));
        }
        state.users.insert(key, user.clone());
        Ok(())
    }

    async fn find_user(&self, nickname: &str) -> DomainResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&nickname.to_lowercase()).cloned())
    }

    async fn find_conflicting_users(&self, nickname: &str, email: &str) -> DomainResult<Vec<User>> {
        let state = self.state.read().await;
        let mut found: Vec<User> = state
            .users
            .values()
            .filter(|u| u.nickname.eq_ignore_ascii_case(nickname) || u.email.eq_ignore_ascii_case(email))
            .cloned()
            .collect();
        found.sort_by_key(|u| u.nickname.to_lowercase());
        Ok(found)
    }

    async fn update_user(&self, nickname: &str, update: &UserUpdate) -> DomainResult<Option<User>> {
        let mut state = self.state.write().await;
        let key = nickname.to_lowercase();
        if !state.users.contains_key(&key) {
            return Ok(None);
        }
        if let Some(email) = &update.email {
            let taken = state
                .users
                .iter()
                .any(|(k, u)| *k != key && u.email.eq_ignore_ascii_case(email));
            if taken {
                return Err(DomainError::Conflict(format!("email {email} is taken")));
            }
        }
        let Some(user) = state.users.get_mut(&key) else {
            return Ok(None);
        };
        if let Some(fullname) = &update.fullname {
            user.fullname = fullname.clone();
        }
        if let Some(about) = &update.about {
            user.about = about.clone();
        }
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        Ok(Some(user.clone()))
    }

    async fn list_forum_users(&self, forum: &str, query: &UserListQuery) -> DomainResult<Vec<User>> {
        let state = self.state.read().await;
        let Some(nicknames) = state.participants.get(&forum.to_lowercase()) else {
            return Ok(Vec::new());
        };
        let since = query.since.as_ref().map(|s| s.to_lowercase());
        let admitted = |nick: &&String| match (&since, query.direction) {
            (None, _) => true,
            (Some(s), Direction::Asc) => nick.as_str() > s.as_str(),
            (Some(s), Direction::Desc) => nick.as_str() < s.as_str(),
        };

        // BTreeSet iteration is already ordered by lowercase nickname.
        let ordered: Box<dyn Iterator<Item = &String>> = match query.direction {
            Direction::Asc => Box::new(nicknames.iter()),
            Direction::Desc => Box::new(nicknames.iter().rev()),
        };
        let mut users: Vec<User> = ordered
            .filter(admitted)
            .filter_map(|nick| state.users.get(nick).cloned())
            .collect();
        if let Some(n) = query.size.get() {
            users.truncate(n);
        }
        Ok(users)
    }
}

#[async_trait]
impl ForumRepository for MemoryStore {
    async fn insert_forum(&self, forum: &NewForum, owner: &str) -> DomainResult<Forum> {
        let mut state = self.state.write().await;
        let key = forum.slug.to_lowercase();
        if state.forums.contains_key(&key) {
            return Err(DomainError::Conflict(format!("forum {} exists", forum.slug)));
        }
        let stored = Forum {
            slug: forum.slug.clone(),
            title: forum.title.clone(),
            user: owner.to_string(),
            posts: 0,
            threads: 0,
        };
        state.forums.insert(key, stored.clone());
        Ok(stored)
    }

    async fn find_forum(&self, slug: &str) -> DomainResult<Option<Forum>> {
        let state = self.state.read().await;
        Ok(state.forums.get(&slug.to_lowercase()).cloned())
    }
}

#[async_trait]
impl ThreadRepository for MemoryStore {
    async fn insert_thread(
        &self,
        forum: &Forum,
        author: &str,
        thread: &NewThread,
        created: DateTime<Utc>,
    ) -> DomainResult<Thread> {
        let mut state = self.state.write().await;
        if let Some(slug) = thread.slug() {
            if state.thread_index(&ThreadRef::Slug(slug.to_string())).is_some() {
                return Err(DomainError::Conflict(format!("thread {slug} exists")));
            }
        }
        let forum_key = forum.slug.to_lowercase();
        let Some(stored_forum) = state.forums.get_mut(&forum_key) else {
            return Err(DomainError::not_found("forum", &forum.slug));
        };
        stored_forum.threads += 1;

        let id = ThreadId::try_from(state.threads.len() + 1)
            .map_err(|_| DomainError::Internal("thread id space exhausted".into()))?;
        let stored = Thread {
            id,
            slug: thread.slug().map(str::to_string),
            title: thread.title.clone(),
            author: author.to_string(),
            forum: forum.slug.clone(),
            message: thread.message.clone(),
            votes: 0,
            created,
        };
        state.threads.push(stored.clone());
        state.join_forum(&forum.slug, author);
        Ok(stored)
    }

    async fn find_thread(&self, thread: &ThreadRef) -> DomainResult<Option<Thread>> {
        let state = self.state.read().await;
        Ok(state.thread_index(thread).map(|i| state.threads[i].clone()))
    }

    async fn list_forum_threads(&self, forum: &str, query: &ThreadListQuery) -> DomainResult<Vec<Thread>> {
        let state = self.state.read().await;
        let mut threads: Vec<Thread> = state
            .threads
            .iter()
            .filter(|t| t.forum.eq_ignore_ascii_case(forum))
            .filter(|t| match (query.since, query.direction) {
                (None, _) => true,
                (Some(since), Direction::Asc) => t.created >= since,
                (Some(since), Direction::Desc) => t.created <= since,
            })
            .cloned()
            .collect();
        threads.sort_by(|a, b| query.direction.orient((a.created, a.id).cmp(&(b.created, b.id))));
        if let Some(n) = query.size.get() {
            threads.truncate(n);
        }
        Ok(threads)
    }

    async fn update_thread(&self, id: ThreadId, update: &ThreadUpdate) -> DomainResult<Option<Thread>> {
        let mut state = self.state.write().await;
        let Some(idx) = state.thread_index(&ThreadRef::Id(id)) else {
            return Ok(None);
        };
        let thread = &mut state.threads[idx];
        if let Some(title) = &update.title {
            thread.title = title.clone();
        }
        if let Some(message) = &update.message {
            thread.message = message.clone();
        }
        Ok(Some(thread.clone()))
    }

    async fn upsert_vote(&self, vote: &Vote) -> DomainResult<Thread> {
        let mut state = self.state.write().await;
        let idx = state
            .thread_index(&ThreadRef::Id(vote.thread))
            .ok_or_else(|| DomainError::not_found("thread", vote.thread))?;
        state.votes.insert((vote.nickname.to_lowercase(), vote.thread), vote.voice);
        let tally: i32 = state
            .votes
            .iter()
            .filter(|((_, thread), _)| *thread == vote.thread)
            .map(|(_, voice)| *voice)
            .sum();
        let thread = &mut state.threads[idx];
        thread.votes = tally;
        Ok(thread.clone())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert_posts(
        &self,
        thread: &Thread,
        posts: &[NewPost],
        created: DateTime<Utc>,
    ) -> DomainResult<Vec<Post>> {
        let mut state = self.state.write().await;
        let base = state.posts.len();
        let mut staged: Vec<Post> = Vec::with_capacity(posts.len());

        for (offset, draft) in posts.iter().enumerate() {
            let id = PostId::try_from(base + offset + 1)
                .map_err(|_| DomainError::Internal("post id space exhausted".into()))?;
            let parent = draft.parent_id();
            // A parent may be a stored post or one staged earlier in this batch.
            let found = parent.and_then(|pid| {
                state
                    .post(pid)
                    .or_else(|| staged.iter().find(|p| p.id == pid))
                    .map(|p| ParentRef { thread: p.thread, path: p.path.clone() })
            });
            let path = path_for_new_post(thread.id, id, parent, found.as_ref())?;
            staged.push(Post {
                id,
                parent,
                author: draft.author.clone(),
                message: draft.message.clone(),
                is_edited: false,
                forum: thread.forum.clone(),
                thread: thread.id,
                created,
                path,
            });
        }

        if let Some(forum) = state.forums.get_mut(&thread.forum.to_lowercase()) {
            forum.posts += staged.len() as i64;
        }
        for post in &staged {
            state.join_forum(&thread.forum, &post.author);
        }
        state.posts.extend(staged.iter().cloned());
        debug!(thread = thread.id, count = staged.len(), "batch committed");
        Ok(staged)
    }

    async fn find_post(&self, id: PostId) -> DomainResult<Option<Post>> {
        let state = self.state.read().await;
        Ok(state.post(id).cloned())
    }

    async fn thread_posts(&self, thread: ThreadId) -> DomainResult<Vec<Post>> {
        let state = self.state.read().await;
        Ok(state.posts.iter().filter(|p| p.thread == thread).cloned().collect())
    }

    async fn update_post_message(&self, id: PostId, message: &str) -> DomainResult<Option<Post>> {
        let mut state = self.state.write().await;
        let Some(idx) = usize::try_from(id).ok().and_then(|i| i.checked_sub(1)) else {
            return Ok(None);
        };
        let Some(post) = state.posts.get_mut(idx) else {
            return Ok(None);
        };
        post.message = message.to_string();
        post.is_edited = true;
        Ok(Some(post.clone()))
    }
}

#[async_trait]
impl ServiceRepository for MemoryStore {
    async fn status(&self) -> DomainResult<ServiceStatus> {
        let state = self.state.read().await;
        Ok(ServiceStatus {
            user: state.users.len() as i64,
            forum: state.forums.len() as i64,
            thread: state.threads.len() as i64,
            post: state.posts.len() as i64,
        })
    }

    async fn clear(&self) -> DomainResult<()> {
        *self.state.write().await = State::default();
        Ok(())
    }
}
