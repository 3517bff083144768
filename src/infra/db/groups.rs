use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{GroupsRepo, RepoError};
use crate::domain::entities::GroupRecord;

use super::PostgresRepositories;
use super::rows::GroupRow;
use super::util::map_sqlx_error;

#[async_trait]
impl GroupsRepo for PostgresRepositories {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let row: Option<GroupRow> =
            sqlx::query_as("SELECT id, title, slug, description FROM groups WHERE slug = $1")
                .bind(slug)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(GroupRecord::from))
    }

    async fn find_group(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError> {
        let row: Option<GroupRow> =
            sqlx::query_as("SELECT id, title, slug, description FROM groups WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(GroupRecord::from))
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let rows: Vec<GroupRow> =
            sqlx::query_as("SELECT id, title, slug, description FROM groups ORDER BY title")
                .fetch_all(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(GroupRecord::from).collect())
    }
}
