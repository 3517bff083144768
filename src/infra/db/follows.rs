use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{FollowsRepo, RepoError};

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn insert_follow_if_absent(
        &self,
        follower_id: Uuid,
        author_id: Uuid,
    ) -> Result<bool, RepoError> {
        // The primary key on (follower_id, author_id) makes repeats a no-op.
        let result = sqlx::query(
            "INSERT INTO follows (follower_id, author_id, created_at) VALUES ($1, $2, now()) \
             ON CONFLICT (follower_id, author_id) DO NOTHING",
        )
        .bind(follower_id)
        .bind(author_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_follow(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND author_id = $2")
                .bind(follower_id)
                .bind(author_id)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn follow_exists(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND author_id = $2)",
        )
        .bind(follower_id)
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(exists.0)
    }

    async fn list_followed_authors(&self, follower_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT author_id FROM follows WHERE follower_id = $1")
                .bind(follower_id)
                .fetch_all(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|row| row.0).collect())
    }
}
