use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    Direction, DomainError, DomainResult, Forum, NewThread, Thread, ThreadId, ThreadListQuery,
    ThreadRef, ThreadRepository, ThreadUpdate, Vote,
};

use super::rows::{ThreadRow, THREAD_COLUMNS};
use super::{db_error, limit, PgStore};

#[async_trait]
impl ThreadRepository for PgStore {
    /// Thread row, forum counter and participant row in one transaction.
    async fn insert_thread(
        &self,
        forum: &Forum,
        author: &str,
        thread: &NewThread,
        created: DateTime<Utc>,
    ) -> DomainResult<Thread> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row = sqlx::query_as::<_, ThreadRow>(&format!(
            "INSERT INTO thread (slug, title, author, forum, message, created) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {THREAD_COLUMNS}"
        ))
        .bind(thread.slug())
        .bind(&thread.title)
        .bind(author)
        .bind(&forum.slug)
        .bind(&thread.message)
        .bind(created)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query("UPDATE forum SET threads = threads + 1 WHERE slug = $1")
            .bind(&forum.slug)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        sqlx::query("INSERT INTO forum_users (forum, nickname) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(&forum.slug)
            .bind(author)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(row.into())
    }

    async fn find_thread(&self, thread: &ThreadRef) -> DomainResult<Option<Thread>> {
        let query = match thread {
            ThreadRef::Id(id) => {
                sqlx::query_as::<_, ThreadRow>(&format!("SELECT {THREAD_COLUMNS} FROM thread WHERE id = $1"))
                    .bind(*id)
                    .fetch_optional(&self.pool)
                    .await
            }
            ThreadRef::Slug(slug) => {
                sqlx::query_as::<_, ThreadRow>(&format!(
                    "SELECT {THREAD_COLUMNS} FROM thread WHERE LOWER(slug) = LOWER($1)"
                ))
                .bind(slug)
                .fetch_optional(&self.pool)
                .await
            }
        };
        Ok(query.map_err(db_error)?.map(Thread::from))
    }

    async fn list_forum_threads(&self, forum: &str, query: &ThreadListQuery) -> DomainResult<Vec<Thread>> {
        let (cmp, order) = match query.direction {
            Direction::Asc => (">=", "ASC"),
            Direction::Desc => ("<=", "DESC"),
        };
        let sql = format!(
            "SELECT {THREAD_COLUMNS} FROM thread \
             WHERE forum = $1 AND ($2::TIMESTAMPTZ IS NULL OR created {cmp} $2) \
             ORDER BY created {order}, id {order} \
             LIMIT $3"
        );
        let rows = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(forum)
            .bind(query.since)
            .bind(limit(query.size))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Thread::from).collect())
    }

    async fn update_thread(&self, id: ThreadId, update: &ThreadUpdate) -> DomainResult<Option<Thread>> {
        let row = sqlx::query_as::<_, ThreadRow>(&format!(
            "UPDATE thread SET title = COALESCE($1, title), message = COALESCE($2, message) \
             WHERE id = $3 RETURNING {THREAD_COLUMNS}"
        ))
        .bind(&update.title)
        .bind(&update.message)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Thread::from))
    }

    /// Upserts the voice, then recomputes the tally from all stored votes.
    async fn upsert_vote(&self, vote: &Vote) -> DomainResult<Thread> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            "INSERT INTO vote (nickname, thread, voice) VALUES ($1, $2, $3) \
             ON CONFLICT (nickname, thread) DO UPDATE SET voice = EXCLUDED.voice",
        )
        .bind(&vote.nickname)
        .bind(vote.thread)
        .bind(vote.voice)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        let row = sqlx::query_as::<_, ThreadRow>(&format!(
            "UPDATE thread SET votes = (SELECT COALESCE(SUM(voice), 0) FROM vote WHERE thread = $1) \
             WHERE id = $1 RETURNING {THREAD_COLUMNS}"
        ))
        .bind(vote.thread)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .ok_or_else(|| DomainError::not_found("thread", vote.thread))?;

        tx.commit().await.map_err(db_error)?;
        Ok(row.into())
    }
}
