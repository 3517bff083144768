//! Domain records shared across the application and infrastructure layers.

use std::fmt;

use time::OffsetDateTime;
use uuid::Uuid;

use super::posts::display_title;

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub joined_at: OffsetDateTime,
}

impl fmt::Display for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

#[derive(Debug, Clone)]
pub struct PostRecord {
    pub id: Uuid,
    pub text: String,
    pub image_path: Option<String>,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl fmt::Display for PostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_title(&self.text))
    }
}

#[derive(Debug, Clone)]
pub struct GroupRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl fmt::Display for GroupRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct FollowRecord {
    pub follower_id: Uuid,
    pub author_id: Uuid,
    pub created_at: OffsetDateTime,
}
