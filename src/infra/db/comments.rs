use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::CommentRecord;

use super::PostgresRepositories;
use super::rows::CommentRow;
use super::util::map_sqlx_error;

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            "SELECT id, post_id, author_id, text, created_at FROM comments \
             WHERE post_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let row: CommentRow = sqlx::query_as(
            "INSERT INTO comments (id, post_id, author_id, text, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, post_id, author_id, text, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(params.post_id)
        .bind(params.author_id)
        .bind(&params.text)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }
}
