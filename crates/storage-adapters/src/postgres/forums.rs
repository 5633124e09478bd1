use async_trait::async_trait;
use domains::{DomainResult, Forum, ForumRepository, NewForum};

use super::rows::{ForumRow, FORUM_COLUMNS};
use super::{db_error, PgStore};

#[async_trait]
impl ForumRepository for PgStore {
    async fn insert_forum(&self, forum: &NewForum, owner: &str) -> DomainResult<Forum> {
        let row = sqlx::query_as::<_, ForumRow>(&format!(
            r#"INSERT INTO forum (slug, title, "user") VALUES ($1, $2, $3) RETURNING {FORUM_COLUMNS}"#
        ))
        .bind(&forum.slug)
        .bind(&forum.title)
        .bind(owner)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.into())
    }

    async fn find_forum(&self, slug: &str) -> DomainResult<Option<Forum>> {
        let row = sqlx::query_as::<_, ForumRow>(&format!(
            "SELECT {FORUM_COLUMNS} FROM forum WHERE LOWER(slug) = LOWER($1)"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Forum::from))
    }
}
