use async_trait::async_trait;
use domains::{Direction, DomainResult, User, UserListQuery, UserRepository, UserUpdate};

use super::rows::{UserRow, USER_COLUMNS};
use super::{db_error, limit, PgStore};

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, user: &User) -> DomainResult<()> {
        sqlx::query("INSERT INTO users (nickname, fullname, about, email) VALUES ($1, $2, $3, $4)")
            .bind(&user.nickname)
            .bind(&user.fullname)
            .bind(&user.about)
            .bind(&user.email)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn find_user(&self, nickname: &str) -> DomainResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(nickname) = LOWER($1)"
        ))
        .bind(nickname)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(User::from))
    }

    async fn find_conflicting_users(&self, nickname: &str, email: &str) -> DomainResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE LOWER(nickname) = LOWER($1) OR LOWER(email) = LOWER($2) \
             ORDER BY LOWER(nickname) COLLATE \"C\""
        ))
        .bind(nickname)
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update_user(&self, nickname: &str, update: &UserUpdate) -> DomainResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET \
                 fullname = COALESCE($1, fullname), \
                 about = COALESCE($2, about), \
                 email = COALESCE($3, email) \
             WHERE LOWER(nickname) = LOWER($4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&update.fullname)
        .bind(&update.about)
        .bind(&update.email)
        .bind(nickname)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(User::from))
    }

    async fn list_forum_users(&self, forum: &str, query: &UserListQuery) -> DomainResult<Vec<User>> {
        let (cmp, order) = match query.direction {
            Direction::Asc => (">", "ASC"),
            Direction::Desc => ("<", "DESC"),
        };
        let sql = format!(
            "SELECT u.nickname, u.fullname, u.about, u.email \
             FROM forum_users fu JOIN users u ON u.nickname = fu.nickname \
             WHERE fu.forum = $1 \
               AND ($2::TEXT IS NULL OR LOWER(u.nickname) COLLATE \"C\" {cmp} LOWER($2) COLLATE \"C\") \
             ORDER BY LOWER(u.nickname) COLLATE \"C\" {order} \
             LIMIT $3"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(forum)
            .bind(&query.since)
            .bind(limit(query.size))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}
