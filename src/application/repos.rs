//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("integrity error: {message}")]
    Integrity { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Feed restriction applied when listing posts.
#[derive(Debug, Clone)]
pub enum FeedQuery {
    All,
    Group(Uuid),
    Author(Uuid),
    Authors(Vec<Uuid>),
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub text: String,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
}

/// Read access to stored posts. Feeds come back ordered newest first,
/// with the id as a deterministic tiebreak.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_feed(&self, query: &FeedQuery) -> Result<Vec<PostRecord>, RepoError>;
    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;
    async fn find_group(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError>;
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;
}

/// Comments are append-only; listing returns creation order.
#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;
    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Insert the pair unless it already exists. Returns true when a row was created.
    async fn insert_follow_if_absent(
        &self,
        follower_id: Uuid,
        author_id: Uuid,
    ) -> Result<bool, RepoError>;
    /// Delete the pair. Returns true when a row was removed.
    async fn delete_follow(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;
    async fn follow_exists(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;
    async fn list_followed_authors(&self, follower_id: Uuid) -> Result<Vec<Uuid>, RepoError>;
}
