use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    path_for_new_post, DomainResult, NewPost, ParentRef, Post, PostId, PostPath, PostRepository,
    Thread, ThreadId,
};
use tracing::debug;

use super::rows::{posts_from_rows, PostRow, POST_COLUMNS};
use super::{db_error, PgStore};

#[async_trait]
impl PostRepository for PgStore {
    /// One transaction per batch. Every row draws its id from the sequence
    /// first so the path can be written together with the row.
    async fn insert_posts(
        &self,
        thread: &Thread,
        posts: &[NewPost],
        created: DateTime<Utc>,
    ) -> DomainResult<Vec<Post>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let mut inserted = Vec::with_capacity(posts.len());

        for new in posts {
            let parent = new.parent_id();
            let found = match parent {
                Some(parent_id) => sqlx::query_as::<_, (ThreadId, Vec<PostId>)>(
                    "SELECT thread, path FROM post WHERE id = $1",
                )
                .bind(parent_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?
                .map(|(thread, path)| PostPath::from_stored(path).map(|path| ParentRef { thread, path }))
                .transpose()?,
                None => None,
            };

            let (id,): (PostId,) = sqlx::query_as("SELECT nextval(pg_get_serial_sequence('post', 'id'))")
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error)?;

            // Dropping `tx` on this error rolls the batch back.
            let path = path_for_new_post(thread.id, id, parent, found.as_ref())?;

            let row = sqlx::query_as::<_, PostRow>(&format!(
                "INSERT INTO post (id, parent, path, thread, forum, author, message, created) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {POST_COLUMNS}"
            ))
            .bind(id)
            .bind(parent)
            .bind(path.as_slice())
            .bind(thread.id)
            .bind(&thread.forum)
            .bind(&new.author)
            .bind(&new.message)
            .bind(created)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;
            inserted.push(row);
        }

        let authors: Vec<String> = posts
            .iter()
            .map(|p| p.author.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        sqlx::query("UPDATE forum SET posts = posts + $1 WHERE slug = $2")
            .bind(i64::try_from(posts.len()).unwrap_or(i64::MAX))
            .bind(&thread.forum)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        sqlx::query(
            "INSERT INTO forum_users (forum, nickname) SELECT $1, UNNEST($2::TEXT[]) \
             ON CONFLICT DO NOTHING",
        )
        .bind(&thread.forum)
        .bind(&authors)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        debug!(thread = thread.id, count = inserted.len(), "posts inserted");
        posts_from_rows(inserted)
    }

    async fn find_post(&self, id: PostId) -> DomainResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!("SELECT {POST_COLUMNS} FROM post WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(Post::try_from).transpose()
    }

    async fn thread_posts(&self, thread: ThreadId) -> DomainResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!("SELECT {POST_COLUMNS} FROM post WHERE thread = $1"))
            .bind(thread)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        posts_from_rows(rows)
    }

    async fn update_post_message(&self, id: PostId, message: &str) -> DomainResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "UPDATE post SET message = $1, is_edited = TRUE WHERE id = $2 RETURNING {POST_COLUMNS}"
        ))
        .bind(message)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(Post::try_from).transpose()
    }
}
