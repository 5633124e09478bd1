//! # Posts
//!
//! Batch creation and the paginated listings of a thread's comment tree.
//!
//! Creation validates what can be checked up front (thread, authors), fixes
//! one timestamp for the batch and hands the rest to
//! [`PostRepository::insert_posts`], which owns the atomic unit: identifier
//! allocation, parent checks and path assignment.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use domains::{
    DomainError, DomainResult, ForumRepository, NewPost, PageRequest, PageSize, Post, PostDetails,
    PostId, PostRepository, PostUpdate, Related, Since, Direction, SortMode, Thread, ThreadRef,
    ThreadRepository, UserRepository,
};
use tracing::{debug, info, instrument};

/// Query for one page of a thread's posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostListing {
    /// `<= 0` means no limit
    pub limit: i64,
    /// `<= 0` means no cursor
    pub since: PostId,
    pub sort: SortMode,
    pub desc: bool,
}

impl Default for PostListing {
    fn default() -> Self {
        Self { limit: 0, since: 0, sort: SortMode::Flat, desc: false }
    }
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    threads: Arc<dyn ThreadRepository>,
    forums: Arc<dyn ForumRepository>,
    users: Arc<dyn UserRepository>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        threads: Arc<dyn ThreadRepository>,
        forums: Arc<dyn ForumRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self { posts, threads, forums, users }
    }

    /// Creates `batch` under `thread`, all or nothing.
    ///
    /// An empty batch returns immediately without touching storage.
    #[instrument(skip(self, batch), fields(size = batch.len()))]
    pub async fn add_posts(&self, thread: &ThreadRef, batch: Vec<NewPost>) -> DomainResult<Vec<Post>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let thread = self.thread(thread).await?;
        let batch = self.canonical_authors(batch).await?;

        let created = Utc::now();
        let posts = self.posts.insert_posts(&thread, &batch, created).await?;
        info!(thread = thread.id, forum = %thread.forum, count = posts.len(), "posts created");
        Ok(posts)
    }

    /// One page of `thread`'s posts in the requested order.
    #[instrument(skip(self))]
    pub async fn thread_posts(&self, thread: &ThreadRef, listing: PostListing) -> DomainResult<Vec<Post>> {
        let thread = self.thread(thread).await?;
        let since = self.resolve_since(listing.sort, listing.since).await?;
        let request = PageRequest {
            size: PageSize::from_limit(listing.limit),
            since,
            direction: Direction::from_desc(listing.desc),
        };

        let posts = self.posts.thread_posts(thread.id).await?;
        debug!(thread = thread.id, total = posts.len(), "paginating thread posts");
        Ok(listing.sort.strategy().page(posts, &request))
    }

    /// A post plus whichever of its author, thread and forum were asked for.
    pub async fn details(&self, id: PostId, related: &[Related]) -> DomainResult<PostDetails> {
        let post = self.post(id).await?;
        let mut details = PostDetails { post, author: None, thread: None, forum: None };

        for item in related {
            match item {
                Related::User => {
                    let nickname = &details.post.author;
                    details.author = Some(
                        self.users
                            .find_user(nickname)
                            .await?
                            .ok_or_else(|| DomainError::not_found("user", nickname))?,
                    );
                }
                Related::Thread => {
                    details.thread = Some(self.thread(&ThreadRef::Id(details.post.thread)).await?);
                }
                Related::Forum => {
                    let slug = &details.post.forum;
                    details.forum = Some(
                        self.forums
                            .find_forum(slug)
                            .await?
                            .ok_or_else(|| DomainError::not_found("forum", slug))?,
                    );
                }
            }
        }
        Ok(details)
    }

    /// Replaces the message. An empty or unchanged message leaves the post
    /// (and its edited flag) untouched.
    #[instrument(skip(self, update))]
    pub async fn edit(&self, id: PostId, update: PostUpdate) -> DomainResult<Post> {
        let current = self.post(id).await?;
        let message = match update.message {
            Some(m) if !m.is_empty() && m != current.message => m,
            _ => return Ok(current),
        };
        self.posts
            .update_post_message(id, &message)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))
    }

    async fn post(&self, id: PostId) -> DomainResult<Post> {
        self.posts
            .find_post(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))
    }

    async fn thread(&self, thread: &ThreadRef) -> DomainResult<Thread> {
        self.threads
            .find_thread(thread)
            .await?
            .ok_or_else(|| DomainError::not_found("thread", thread))
    }

    /// Looks up the cursor post's path when the sort mode compares paths.
    async fn resolve_since(&self, sort: SortMode, since: PostId) -> DomainResult<Since> {
        if Since::is_unbounded_marker(since) {
            return Ok(Since::Unbounded);
        }
        let path = if sort.needs_cursor_path() {
            self.posts.find_post(since).await?.map(|p| p.path)
        } else {
            None
        };
        Ok(Since::resolved(since, path))
    }

    /// Replaces every author with the stored nickname, failing on the first
    /// unknown one.
    async fn canonical_authors(&self, mut batch: Vec<NewPost>) -> DomainResult<Vec<NewPost>> {
        let mut known: HashMap<String, String> = HashMap::new();
        for post in &mut batch {
            let key = post.author.to_lowercase();
            let nickname = match known.get(&key) {
                Some(n) => n.clone(),
                None => {
                    let user = self
                        .users
                        .find_user(&post.author)
                        .await?
                        .ok_or_else(|| DomainError::not_found("user", &post.author))?;
                    known.insert(key, user.nickname.clone());
                    user.nickname
                }
            };
            post.author = nickname;
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{
        MockForumRepository, MockPostRepository, MockThreadRepository, MockUserRepository, PostPath,
        User,
    };
    use tokio_test::{assert_err, assert_ok};

    fn thread() -> Thread {
        Thread {
            id: 10,
            slug: Some("t".into()),
            title: "t".into(),
            author: "alice".into(),
            forum: "f".into(),
            message: "m".into(),
            votes: 0,
            created: Utc::now(),
        }
    }

    fn post(path: &[PostId]) -> Post {
        let path = PostPath::from_stored(path.to_vec()).unwrap();
        Post {
            id: path.leaf_id(),
            parent: path.parent_id(),
            author: "alice".into(),
            message: format!("post {}", path),
            is_edited: false,
            forum: "f".into(),
            thread: 10,
            created: Utc::now(),
            path,
        }
    }

    fn draft(author: &str, parent: Option<PostId>) -> NewPost {
        NewPost { parent, author: author.into(), message: "hello".into() }
    }

    fn threads_with_one() -> MockThreadRepository {
        let mut threads = MockThreadRepository::new();
        threads.expect_find_thread().returning(|_| Ok(Some(thread())));
        threads
    }

    fn users_known() -> MockUserRepository {
        let mut users = MockUserRepository::new();
        users.expect_find_user().returning(|nick| {
            Ok(Some(User {
                nickname: nick.to_lowercase(),
                fullname: String::new(),
                about: String::new(),
                email: String::new(),
            }))
        });
        users
    }

    fn service(posts: MockPostRepository, threads: MockThreadRepository, users: MockUserRepository) -> PostService {
        PostService::new(Arc::new(posts), Arc::new(threads), Arc::new(MockForumRepository::new()), Arc::new(users))
    }

    #[tokio::test]
    async fn empty_batch_never_touches_storage() {
        let mut threads = MockThreadRepository::new();
        threads.expect_find_thread().never();
        let mut posts = MockPostRepository::new();
        posts.expect_insert_posts().never();

        let svc = service(posts, threads, MockUserRepository::new());
        let created = assert_ok!(svc.add_posts(&ThreadRef::Id(404), Vec::new()).await);
        assert!(created.is_empty());
    }

    #[tokio::test]
    async fn batch_is_inserted_with_canonical_authors() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_insert_posts()
            .withf(|t, batch, _| t.id == 10 && batch.iter().all(|p| p.author == "alice"))
            .times(1)
            .returning(|_, batch, _| {
                Ok(batch.iter().enumerate().map(|(i, _)| post(&[i as PostId + 1])).collect())
            });

        let svc = service(posts, threads_with_one(), users_known());
        let batch = vec![draft("ALICE", None), draft("Alice", None)];
        let created = assert_ok!(svc.add_posts(&ThreadRef::Slug("t".into()), batch).await);
        assert_eq!(created.len(), 2);
    }

    #[tokio::test]
    async fn unknown_author_rejects_whole_batch() {
        let mut users = MockUserRepository::new();
        users.expect_find_user().returning(|nick| {
            Ok((nick == "alice").then(|| User {
                nickname: "alice".into(),
                fullname: String::new(),
                about: String::new(),
                email: String::new(),
            }))
        });
        let mut posts = MockPostRepository::new();
        posts.expect_insert_posts().never();

        let svc = service(posts, threads_with_one(), users);
        let err = assert_err!(svc.add_posts(&ThreadRef::Id(10), vec![draft("alice", None), draft("mallory", None)]).await);
        assert_eq!(err, DomainError::not_found("user", "mallory"));
    }

    #[tokio::test]
    async fn parent_conflict_from_storage_propagates() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_insert_posts()
            .returning(|_, _, _| Err(DomainError::Conflict("parent post 99 does not exist".into())));

        let svc = service(posts, threads_with_one(), users_known());
        let err = assert_err!(svc.add_posts(&ThreadRef::Id(10), vec![draft("alice", Some(99))]).await);
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn tree_listing_resolves_cursor_path() {
        let mut posts = MockPostRepository::new();
        posts.expect_find_post().withf(|id| *id == 2).returning(|_| Ok(Some(post(&[1, 2]))));
        posts
            .expect_thread_posts()
            .returning(|_| Ok(vec![post(&[3]), post(&[1, 2]), post(&[1]), post(&[1, 2, 4])]));

        let svc = service(posts, threads_with_one(), MockUserRepository::new());
        let listing = PostListing { limit: 0, since: 2, sort: SortMode::Tree, desc: false };
        let page = assert_ok!(svc.thread_posts(&ThreadRef::Id(10), listing).await);
        let ids: Vec<PostId> = page.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[tokio::test]
    async fn flat_listing_skips_cursor_lookup() {
        let mut posts = MockPostRepository::new();
        posts.expect_find_post().never();
        posts.expect_thread_posts().returning(|_| Ok(vec![post(&[1]), post(&[2]), post(&[3])]));

        let svc = service(posts, threads_with_one(), MockUserRepository::new());
        let listing = PostListing { limit: 1, since: 3, sort: SortMode::Flat, desc: true };
        let page = assert_ok!(svc.thread_posts(&ThreadRef::Id(10), listing).await);
        assert_eq!(page.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn listing_of_missing_thread_is_not_found() {
        let mut threads = MockThreadRepository::new();
        threads.expect_find_thread().returning(|_| Ok(None));

        let svc = service(MockPostRepository::new(), threads, MockUserRepository::new());
        let err = assert_err!(svc.thread_posts(&ThreadRef::Slug("gone".into()), PostListing::default()).await);
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn unchanged_message_is_not_an_edit() {
        let mut posts = MockPostRepository::new();
        posts.expect_find_post().returning(|_| Ok(Some(post(&[1]))));
        posts.expect_update_post_message().never();

        let svc = service(posts, MockThreadRepository::new(), MockUserRepository::new());
        let same = PostUpdate { message: Some("post 1".into()) };
        let p = assert_ok!(svc.edit(1, same).await);
        assert!(!p.is_edited);
        let empty = PostUpdate { message: None };
        assert_ok!(svc.edit(1, empty).await);
    }

    #[tokio::test]
    async fn details_embed_requested_entities_only() {
        let mut posts = MockPostRepository::new();
        posts.expect_find_post().returning(|_| Ok(Some(post(&[1]))));

        let svc = service(posts, threads_with_one(), users_known());
        let details = assert_ok!(svc.details(1, &[Related::User, Related::Thread]).await);
        assert_eq!(details.author.map(|u| u.nickname).as_deref(), Some("alice"));
        assert_eq!(details.thread.map(|t| t.id), Some(10));
        assert!(details.forum.is_none());
    }
}
