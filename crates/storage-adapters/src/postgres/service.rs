use async_trait::async_trait;
use domains::{DomainResult, ServiceRepository, ServiceStatus};
use tracing::debug;

use super::{db_error, PgStore};

#[async_trait]
impl ServiceRepository for PgStore {
    async fn status(&self) -> DomainResult<ServiceStatus> {
        let (user, forum, thread, post): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM users), (SELECT COUNT(*) FROM forum), \
                    (SELECT COUNT(*) FROM thread), (SELECT COUNT(*) FROM post)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(ServiceStatus { user, forum, thread, post })
    }

    async fn clear(&self) -> DomainResult<()> {
        sqlx::query("TRUNCATE users, forum, thread, post, vote, forum_users RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        debug!("all tables truncated");
        Ok(())
    }
}
