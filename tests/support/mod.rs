#![allow(dead_code)]

use std::sync::{Arc, RwLock, atomic::AtomicI64, atomic::Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use ritrovo::{
    application::{
        comments::CommentService,
        feed::FeedService,
        follows::FollowService,
        posts::PostService,
        repos::{
            CommentsRepo, CreateCommentParams, CreatePostParams, FeedQuery, FollowsRepo,
            GroupsRepo, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams, UsersRepo,
        },
    },
    cache::{CacheConfig, CacheState, PageCache},
    domain::entities::{CommentRecord, FollowRecord, GroupRecord, PostRecord, UserRecord},
    infra::http::{HttpState, SESSION_COOKIE, SessionStore, build_router},
    infra::uploads::UploadStorage,
};
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// In-memory stand-in for the Postgres adapter, good enough for routing and
/// feed-semantics assertions.
#[derive(Default)]
pub struct InMemoryRepos {
    pub users: RwLock<Vec<UserRecord>>,
    pub groups: RwLock<Vec<GroupRecord>>,
    pub posts: RwLock<Vec<PostRecord>>,
    pub comments: RwLock<Vec<CommentRecord>>,
    pub follows: RwLock<Vec<FollowRecord>>,
    clock: AtomicI64,
}

impl InMemoryRepos {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Strictly increasing timestamps so feed ordering is deterministic.
    pub fn next_instant(&self) -> OffsetDateTime {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        OffsetDateTime::from_unix_timestamp(1_700_000_000 + tick).expect("valid timestamp")
    }

    pub fn seed_user(&self, username: &str) -> UserRecord {
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            joined_at: self.next_instant(),
        };
        self.users.write().expect("users lock").push(user.clone());
        user
    }

    pub fn seed_group(&self, title: &str, slug: &str) -> GroupRecord {
        let group = GroupRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("About {title}"),
        };
        self.groups
            .write()
            .expect("groups lock")
            .push(group.clone());
        group
    }

    pub fn seed_post(&self, author: &UserRecord, group: Option<&GroupRecord>, text: &str) -> PostRecord {
        let post = PostRecord {
            id: Uuid::new_v4(),
            text: text.to_string(),
            image_path: None,
            author_id: author.id,
            group_id: group.map(|group| group.id),
            created_at: self.next_instant(),
        };
        self.posts.write().expect("posts lock").push(post.clone());
        post
    }

    pub fn follow_count(&self, follower_id: Uuid, author_id: Uuid) -> usize {
        self.follows
            .read()
            .expect("follows lock")
            .iter()
            .filter(|record| record.follower_id == follower_id && record.author_id == author_id)
            .count()
    }

    fn sorted_feed(&self, mut records: Vec<PostRecord>) -> Vec<PostRecord> {
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        records
    }
}

#[async_trait]
impl PostsRepo for InMemoryRepos {
    async fn list_feed(&self, query: &FeedQuery) -> Result<Vec<PostRecord>, RepoError> {
        let posts = self.posts.read().expect("posts lock").clone();
        let filtered = posts
            .into_iter()
            .filter(|post| match query {
                FeedQuery::All => true,
                FeedQuery::Group(group_id) => post.group_id == Some(*group_id),
                FeedQuery::Author(author_id) => post.author_id == *author_id,
                FeedQuery::Authors(author_ids) => author_ids.contains(&post.author_id),
            })
            .collect();
        Ok(self.sorted_feed(filtered))
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .posts
            .read()
            .expect("posts lock")
            .iter()
            .find(|post| post.id == id)
            .cloned())
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryRepos {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let post = PostRecord {
            id: Uuid::new_v4(),
            text: params.text,
            image_path: params.image_path,
            author_id: params.author_id,
            group_id: params.group_id,
            created_at: self.next_instant(),
        };
        self.posts.write().expect("posts lock").push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.write().expect("posts lock");
        let post = posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image_path = params.image_path;
        Ok(post.clone())
    }
}

#[async_trait]
impl GroupsRepo for InMemoryRepos {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .groups
            .read()
            .expect("groups lock")
            .iter()
            .find(|group| group.slug == slug)
            .cloned())
    }

    async fn find_group(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .groups
            .read()
            .expect("groups lock")
            .iter()
            .find(|group| group.id == id)
            .cloned())
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        Ok(self.groups.read().expect("groups lock").clone())
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepos {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .read()
            .expect("users lock")
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .read()
            .expect("users lock")
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }
}

#[async_trait]
impl CommentsRepo for InMemoryRepos {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let mut records: Vec<CommentRecord> = self
            .comments
            .read()
            .expect("comments lock")
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: self.next_instant(),
        };
        self.comments
            .write()
            .expect("comments lock")
            .push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for InMemoryRepos {
    async fn insert_follow_if_absent(
        &self,
        follower_id: Uuid,
        author_id: Uuid,
    ) -> Result<bool, RepoError> {
        let mut follows = self.follows.write().expect("follows lock");
        let exists = follows
            .iter()
            .any(|record| record.follower_id == follower_id && record.author_id == author_id);
        if exists {
            return Ok(false);
        }
        follows.push(FollowRecord {
            follower_id,
            author_id,
            created_at: self.next_instant(),
        });
        Ok(true)
    }

    async fn delete_follow(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut follows = self.follows.write().expect("follows lock");
        let before = follows.len();
        follows
            .retain(|record| !(record.follower_id == follower_id && record.author_id == author_id));
        Ok(follows.len() < before)
    }

    async fn follow_exists(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        Ok(self
            .follows
            .read()
            .expect("follows lock")
            .iter()
            .any(|record| record.follower_id == follower_id && record.author_id == author_id))
    }

    async fn list_followed_authors(&self, follower_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        Ok(self
            .follows
            .read()
            .expect("follows lock")
            .iter()
            .filter(|record| record.follower_id == follower_id)
            .map(|record| record.author_id)
            .collect())
    }
}

pub struct TestApp {
    pub router: Router,
    pub repos: Arc<InMemoryRepos>,
    pub sessions: Arc<SessionStore>,
    pub cache: Option<Arc<PageCache>>,
    _uploads_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_cache_config(None)
    }

    pub fn with_cache(config: CacheConfig) -> Self {
        Self::with_cache_config(Some(config))
    }

    fn with_cache_config(cache_config: Option<CacheConfig>) -> Self {
        let repos = InMemoryRepos::new();
        let sessions = Arc::new(SessionStore::new());

        let posts_repo: Arc<dyn PostsRepo> = repos.clone();
        let posts_write_repo: Arc<dyn PostsWriteRepo> = repos.clone();
        let groups_repo: Arc<dyn GroupsRepo> = repos.clone();
        let users_repo: Arc<dyn UsersRepo> = repos.clone();
        let comments_repo: Arc<dyn CommentsRepo> = repos.clone();
        let follows_repo: Arc<dyn FollowsRepo> = repos.clone();

        let feed = Arc::new(FeedService::new(
            posts_repo.clone(),
            groups_repo.clone(),
            users_repo.clone(),
            follows_repo.clone(),
            10,
        ));
        let posts = Arc::new(PostService::new(
            posts_repo.clone(),
            posts_write_repo,
            groups_repo.clone(),
        ));
        let comments = Arc::new(CommentService::new(comments_repo, posts_repo));
        let follows = Arc::new(FollowService::new(follows_repo, users_repo.clone()));

        let uploads_dir = tempfile::tempdir().expect("tempdir");
        let uploads =
            Arc::new(UploadStorage::new(uploads_dir.path().to_path_buf()).expect("storage"));

        let (cache_state, cache_store) = match cache_config {
            Some(config) => {
                let store = Arc::new(PageCache::new());
                (
                    Some(CacheState {
                        config,
                        store: store.clone(),
                    }),
                    Some(store),
                )
            }
            None => (None, None),
        };

        let state = HttpState {
            feed,
            posts,
            comments,
            follows,
            users: users_repo,
            groups: groups_repo,
            sessions: sessions.clone(),
            uploads,
            cache: cache_state,
        };

        Self {
            router: build_router(state, UPLOAD_BODY_LIMIT),
            repos,
            sessions,
            cache: cache_store,
            _uploads_dir: uploads_dir,
        }
    }

    /// Cookie header value for a freshly opened session.
    pub fn session_for(&self, user: &UserRecord) -> String {
        let token = self.sessions.open(user.id);
        format!("{SESSION_COOKIE}={token}")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn get_with_session(&self, uri: &str, cookie: &str) -> Response<Body> {
        let request = Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn post_form(&self, uri: &str, cookie: Option<&str>, body: &str) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::from(body.to_string())).expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        cookie: Option<&str>,
        body: Vec<u8>,
        boundary: &str,
    ) -> Response<Body> {
        let mut builder = Request::builder().method("POST").uri(uri).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::from(body)).expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

pub fn location_header(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Build a multipart body for the post form.
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: format!("----ritrovo-test-{}", Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        self.body
            .extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> (Vec<u8>, String) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (self.body, self.boundary)
    }
}
