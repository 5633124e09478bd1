use chrono::{DateTime, Utc};
use domains::{DomainError, Forum, Post, PostPath, Thread, User};

pub(crate) const USER_COLUMNS: &str = "nickname, fullname, about, email";
pub(crate) const FORUM_COLUMNS: &str = r#"slug, title, "user", posts, threads"#;
pub(crate) const THREAD_COLUMNS: &str = "id, slug, title, author, forum, message, votes, created";
pub(crate) const POST_COLUMNS: &str =
    "id, parent, path, thread, forum, author, message, is_edited, created";

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    nickname: String,
    fullname: String,
    about: String,
    email: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User { nickname: row.nickname, fullname: row.fullname, about: row.about, email: row.email }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ForumRow {
    slug: String,
    title: String,
    user: String,
    posts: i64,
    threads: i32,
}

impl From<ForumRow> for Forum {
    fn from(row: ForumRow) -> Self {
        Forum { slug: row.slug, title: row.title, user: row.user, posts: row.posts, threads: row.threads }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ThreadRow {
    id: i32,
    slug: Option<String>,
    title: String,
    author: String,
    forum: String,
    message: String,
    votes: i32,
    created: DateTime<Utc>,
}

impl From<ThreadRow> for Thread {
    fn from(row: ThreadRow) -> Self {
        Thread {
            id: row.id,
            slug: row.slug,
            title: row.title,
            author: row.author,
            forum: row.forum,
            message: row.message,
            votes: row.votes,
            created: row.created,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    id: i64,
    parent: Option<i64>,
    path: Vec<i64>,
    thread: i32,
    forum: String,
    author: String,
    message: String,
    is_edited: bool,
    created: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = DomainError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let path = PostPath::from_stored(row.path)?;
        if path.leaf_id() != row.id {
            return Err(DomainError::Internal(format!(
                "post {} has a path ending in {}",
                row.id,
                path.leaf_id()
            )));
        }
        Ok(Post {
            id: row.id,
            parent: row.parent,
            author: row.author,
            message: row.message,
            is_edited: row.is_edited,
            forum: row.forum,
            thread: row.thread,
            created: row.created,
            path,
        })
    }
}

pub(crate) fn posts_from_rows(rows: Vec<PostRow>) -> Result<Vec<Post>, DomainError> {
    rows.into_iter().map(Post::try_from).collect()
}
