use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

use super::PostgresRepositories;
use super::rows::UserRow;
use super::util::map_sqlx_error;

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, joined_at FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, joined_at FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }
}
