//! Post authoring: creation, editing, and the author-only edit capability.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::PostRecord;
use crate::domain::posts::validate_text;

use super::repos::{
    CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post validation failed: {message}")]
    Validation { message: String },
    #[error("only the author may edit a post")]
    Forbidden,
    #[error("unknown post")]
    UnknownPost,
    #[error("unknown group")]
    UnknownGroup,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Fields accepted from the post form.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image_path: Option<String>,
}

/// Whether `viewer` may change the post. Only the author qualifies.
pub fn can_edit(viewer: Uuid, post: &PostRecord) -> bool {
    viewer == post.author_id
}

pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
    ) -> Self {
        Self {
            posts,
            posts_write,
            groups,
        }
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<PostRecord>, PostError> {
        Ok(self.posts.find_post(id).await?)
    }

    /// Run create validation without persisting anything. Handlers call
    /// this before committing side effects outside the repository, such as
    /// media storage.
    pub async fn check_create(&self, input: &PostInput) -> Result<(), PostError> {
        self.validate(input).await
    }

    /// Check that `viewer` may apply this edit, without persisting
    /// anything. Fails exactly where [`PostService::edit`] would.
    pub async fn check_edit(
        &self,
        viewer: Uuid,
        post_id: Uuid,
        input: &PostInput,
    ) -> Result<(), PostError> {
        let existing = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(PostError::UnknownPost)?;

        if !can_edit(viewer, &existing) {
            return Err(PostError::Forbidden);
        }

        self.validate(input).await
    }

    /// Persist a new post. Nothing is written when validation fails.
    pub async fn create(
        &self,
        author_id: Uuid,
        input: PostInput,
    ) -> Result<PostRecord, PostError> {
        self.validate(&input).await?;

        let record = self
            .posts_write
            .create_post(CreatePostParams {
                text: input.text,
                author_id,
                group_id: input.group_id,
                image_path: input.image_path,
            })
            .await?;

        Ok(record)
    }

    /// Apply an edit on behalf of `viewer`. A non-author viewer gets
    /// `Forbidden` and the stored post stays untouched. An absent image in
    /// the input keeps the existing one.
    pub async fn edit(
        &self,
        viewer: Uuid,
        post_id: Uuid,
        input: PostInput,
    ) -> Result<PostRecord, PostError> {
        let existing = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(PostError::UnknownPost)?;

        if !can_edit(viewer, &existing) {
            return Err(PostError::Forbidden);
        }

        self.validate(&input).await?;

        let image_path = input.image_path.or(existing.image_path);
        let record = self
            .posts_write
            .update_post(UpdatePostParams {
                id: post_id,
                text: input.text,
                group_id: input.group_id,
                image_path,
            })
            .await?;

        Ok(record)
    }

    async fn validate(&self, input: &PostInput) -> Result<(), PostError> {
        validate_text(&input.text).map_err(|err| PostError::Validation {
            message: err.to_string(),
        })?;

        if let Some(group_id) = input.group_id
            && self.groups.find_group(group_id).await?.is_none()
        {
            return Err(PostError::UnknownGroup);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn sample_post(author_id: Uuid) -> PostRecord {
        PostRecord {
            id: Uuid::new_v4(),
            text: "hello".to_string(),
            image_path: None,
            author_id,
            group_id: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn author_can_edit_own_post() {
        let author = Uuid::new_v4();
        let post = sample_post(author);
        assert!(can_edit(author, &post));
    }

    #[test]
    fn other_viewer_cannot_edit() {
        let post = sample_post(Uuid::new_v4());
        assert!(!can_edit(Uuid::new_v4(), &post));
    }
}
