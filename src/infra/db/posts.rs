use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreatePostParams, FeedQuery, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::PostgresRepositories;
use super::rows::PostRow;
use super::util::map_sqlx_error;

const POST_COLUMNS: &str = "p.id, p.text, p.image_path, p.author_id, p.group_id, p.created_at";

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_feed(&self, query: &FeedQuery) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts p WHERE TRUE"));

        match query {
            FeedQuery::All => {}
            FeedQuery::Group(group_id) => {
                qb.push(" AND p.group_id = ");
                qb.push_bind(*group_id);
            }
            FeedQuery::Author(author_id) => {
                qb.push(" AND p.author_id = ");
                qb.push_bind(*author_id);
            }
            FeedQuery::Authors(author_ids) => {
                if author_ids.is_empty() {
                    return Ok(Vec::new());
                }
                qb.push(" AND p.author_id = ANY(");
                qb.push_bind(author_ids.clone());
                qb.push(")");
            }
        }

        qb.push(" ORDER BY p.created_at DESC, p.id DESC");

        let rows: Vec<PostRow> = qb
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row: Option<PostRow> = sqlx::query_as(
            "SELECT p.id, p.text, p.image_path, p.author_id, p.group_id, p.created_at \
             FROM posts p WHERE p.id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let row: PostRow = sqlx::query_as(
            "INSERT INTO posts (id, text, image_path, author_id, group_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, text, image_path, author_id, group_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&params.text)
        .bind(&params.image_path)
        .bind(params.author_id)
        .bind(params.group_id)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let row: PostRow = sqlx::query_as(
            "UPDATE posts SET text = $2, group_id = $3, image_path = $4 WHERE id = $1 \
             RETURNING id, text, image_path, author_id, group_id, created_at",
        )
        .bind(params.id)
        .bind(&params.text)
        .bind(params.group_id)
        .bind(&params.image_path)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }
}
