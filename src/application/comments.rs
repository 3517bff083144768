//! Comments: append-only remarks attached to a post.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::CommentRecord;
use crate::domain::posts::validate_text;

use super::repos::{CommentsRepo, CreateCommentParams, PostsRepo, RepoError};

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("comment validation failed: {message}")]
    Validation { message: String },
    #[error("unknown post")]
    UnknownPost,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct CommentService {
    comments: Arc<dyn CommentsRepo>,
    posts: Arc<dyn PostsRepo>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentsRepo>, posts: Arc<dyn PostsRepo>) -> Self {
        Self { comments, posts }
    }

    /// Comments for a post, oldest first.
    pub async fn list(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, CommentError> {
        Ok(self.comments.list_comments(post_id).await?)
    }

    /// Attach a comment to an existing post. Persists exactly one row per call.
    pub async fn add(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        text: String,
    ) -> Result<CommentRecord, CommentError> {
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(CommentError::UnknownPost);
        }

        validate_text(&text).map_err(|err| CommentError::Validation {
            message: err.to_string(),
        })?;

        let record = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                text,
            })
            .await?;

        Ok(record)
    }
}
