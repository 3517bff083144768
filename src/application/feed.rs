//! Feed selection: ordered post listings for the public pages.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use time::macros::format_description;
use uuid::Uuid;

use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};
use crate::domain::posts::display_title;
use crate::presentation::views::{FeedContext, PaginationView, PostCard};

use super::pagination::{Page, PageNumber, paginate};
use super::repos::{FeedQuery, FollowsRepo, GroupsRepo, PostsRepo, RepoError, UsersRepo};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown author")]
    UnknownAuthor,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Which feed a request is asking for.
#[derive(Debug, Clone)]
pub enum FeedScope {
    Index,
    Group { slug: String },
    Profile { username: String },
    Following { viewer: Uuid },
}

/// A group feed page together with the group it belongs to.
pub struct GroupFeed {
    pub group: GroupRecord,
    pub context: FeedContext,
}

/// A profile feed page together with the resolved author.
pub struct ProfileFeed {
    pub author: UserRecord,
    pub total_posts: usize,
    pub context: FeedContext,
}

pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    page_size: usize,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        page_size: usize,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
            page_size,
        }
    }

    /// Resolve a scope to its ordered post listing (newest first, id as
    /// tiebreak). Read-only; ordering comes from the repository.
    pub async fn select(&self, scope: &FeedScope) -> Result<Vec<PostRecord>, FeedError> {
        let query = match scope {
            FeedScope::Index => FeedQuery::All,
            FeedScope::Group { slug } => {
                let group = self
                    .groups
                    .find_group_by_slug(slug)
                    .await?
                    .ok_or(FeedError::UnknownGroup)?;
                FeedQuery::Group(group.id)
            }
            FeedScope::Profile { username } => {
                let author = self
                    .users
                    .find_user_by_username(username)
                    .await?
                    .ok_or(FeedError::UnknownAuthor)?;
                FeedQuery::Author(author.id)
            }
            FeedScope::Following { viewer } => {
                let authors = self.follows.list_followed_authors(*viewer).await?;
                if authors.is_empty() {
                    return Ok(Vec::new());
                }
                FeedQuery::Authors(authors)
            }
        };

        Ok(self.posts.list_feed(&query).await?)
    }

    pub async fn index_page(&self, page: PageNumber) -> Result<FeedContext, FeedError> {
        let records = self.select(&FeedScope::Index).await?;
        self.page_context(records, page).await
    }

    pub async fn group_page(&self, slug: &str, page: PageNumber) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownGroup)?;
        let records = self.posts.list_feed(&FeedQuery::Group(group.id)).await?;
        let context = self.page_context(records, page).await?;
        Ok(GroupFeed { group, context })
    }

    pub async fn profile_page(
        &self,
        username: &str,
        page: PageNumber,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(FeedError::UnknownAuthor)?;
        let records = self.posts.list_feed(&FeedQuery::Author(author.id)).await?;
        let total_posts = records.len();
        let context = self.page_context(records, page).await?;
        Ok(ProfileFeed {
            author,
            total_posts,
            context,
        })
    }

    pub async fn follow_page(
        &self,
        viewer: Uuid,
        page: PageNumber,
    ) -> Result<FeedContext, FeedError> {
        let records = self.select(&FeedScope::Following { viewer }).await?;
        self.page_context(records, page).await
    }

    /// Paginate records and map them to renderable cards.
    async fn page_context(
        &self,
        records: Vec<PostRecord>,
        page: PageNumber,
    ) -> Result<FeedContext, FeedError> {
        let page = paginate(records, self.page_size, page);

        let mut cards = Vec::with_capacity(page.items.len());
        let mut usernames: HashMap<Uuid, String> = HashMap::new();
        let mut group_labels: HashMap<Uuid, (String, String)> = HashMap::new();

        for record in &page.items {
            let author_username = match usernames.get(&record.author_id) {
                Some(name) => name.clone(),
                None => {
                    let user = self
                        .users
                        .find_user(record.author_id)
                        .await?
                        .ok_or(RepoError::NotFound)?;
                    usernames.insert(record.author_id, user.username.clone());
                    user.username
                }
            };

            let group = match record.group_id {
                Some(group_id) => match group_labels.get(&group_id) {
                    Some(label) => Some(label.clone()),
                    None => {
                        let group = self
                            .groups
                            .find_group(group_id)
                            .await?
                            .ok_or(RepoError::NotFound)?;
                        let label = (group.title, group.slug);
                        group_labels.insert(group_id, label.clone());
                        Some(label)
                    }
                },
                None => None,
            };

            cards.push(post_card(record, author_username, group));
        }

        Ok(feed_context(&page, cards))
    }
}

pub(crate) fn post_card(
    record: &PostRecord,
    author_username: String,
    group: Option<(String, String)>,
) -> PostCard {
    let (group_title, group_slug) = match group {
        Some((title, slug)) => (Some(title), Some(slug)),
        None => (None, None),
    };

    PostCard {
        id: record.id.to_string(),
        title: display_title(&record.text),
        text: record.text.clone(),
        author_username,
        group_title,
        group_slug,
        image_path: record.image_path.clone(),
        published: format_published(&record.created_at),
    }
}

pub(crate) fn format_published(moment: &time::OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    moment.format(&format).unwrap_or_default()
}

fn feed_context<T>(page: &Page<T>, cards: Vec<PostCard>) -> FeedContext {
    FeedContext {
        post_count: cards.len(),
        total_count: page.total_items,
        has_results: !cards.is_empty(),
        posts: cards,
        pagination: PaginationView {
            number: page.number,
            total_pages: page.total_pages,
            has_prev: page.has_prev,
            has_next: page.has_next,
            prev_number: page.number.saturating_sub(1).max(1),
            next_number: (page.number + 1).min(page.total_pages),
        },
    }
}
