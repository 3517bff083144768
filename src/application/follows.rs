//! Follow relationships between readers and authors.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::UserRecord;

use super::repos::{FollowsRepo, RepoError, UsersRepo};

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown author")]
    UnknownAuthor,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct FollowService {
    follows: Arc<dyn FollowsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowsRepo>, users: Arc<dyn UsersRepo>) -> Self {
        Self { follows, users }
    }

    /// Follow `username`. Idempotent: repeated calls leave exactly one row
    /// for the pair. Returns the resolved author.
    pub async fn follow(
        &self,
        follower_id: Uuid,
        username: &str,
    ) -> Result<UserRecord, FollowError> {
        let author = self.resolve(username).await?;
        self.follows
            .insert_follow_if_absent(follower_id, author.id)
            .await?;
        Ok(author)
    }

    /// Stop following `username`. An absent pair is a successful no-op.
    pub async fn unfollow(
        &self,
        follower_id: Uuid,
        username: &str,
    ) -> Result<UserRecord, FollowError> {
        let author = self.resolve(username).await?;
        self.follows.delete_follow(follower_id, author.id).await?;
        Ok(author)
    }

    pub async fn is_following(
        &self,
        follower_id: Uuid,
        author_id: Uuid,
    ) -> Result<bool, FollowError> {
        Ok(self.follows.follow_exists(follower_id, author_id).await?)
    }

    async fn resolve(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or(FollowError::UnknownAuthor)
    }
}
