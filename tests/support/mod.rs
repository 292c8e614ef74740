#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower::ServiceExt;

use folio::application::attachments::AttachmentService;
use folio::application::credentials::{CredentialService, hash_password};
use folio::application::posts::{DEFAULT_MIN_RANK, PostService};
use folio::application::repos::{
    AttachmentStore, CreatePostParams, CredentialsRepo, FeaturedRepo, ObjectDownload, PostsRepo,
    RepoError, SessionsRepo, StorageError, StoredObject, UpdatePostParams,
};
use folio::application::sessions::SessionService;
use folio::domain::entities::{PostInfo, PostRecord, SessionRecord};
use folio::infra::assets::DEFAULT_COVER_PNG;
use folio::infra::http::{AttemptLimiter, HttpState, build_router};
use folio::infra::storage::ObjectAttachmentStore;

pub const PASSWORD: &str = "correct horse battery staple";
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024;

/// In-memory stand-in for the Postgres repositories.
#[derive(Default)]
pub struct MemoryRepositories {
    pub posts: Mutex<Vec<PostRecord>>,
    pub featured: Mutex<Vec<String>>,
    pub password_hash: Mutex<Option<String>>,
    pub sessions: Mutex<Vec<SessionRecord>>,
}

fn visible(post: &PostRecord, include_unlisted: bool) -> bool {
    include_unlisted || !post.unlisted
}

fn newest_first(posts: &mut [PostRecord]) {
    posts.sort_by(|a, b| b.created.cmp(&a.created));
}

/// Share of query terms found anywhere in the post.
fn rank(post: &PostRecord, query: &str) -> f32 {
    let haystack = format!("{} {} {}", post.title, post.description, post.content).to_lowercase();
    let terms: Vec<String> = query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if terms.is_empty() {
        return 0.0;
    }
    let hits = terms
        .iter()
        .filter(|term| haystack.contains(term.as_str()))
        .count();
    hits as f32 / terms.len() as f32
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn list_posts(&self, include_unlisted: bool) -> Result<Vec<PostInfo>, RepoError> {
        let mut posts: Vec<PostRecord> = self
            .posts
            .lock()
            .await
            .iter()
            .filter(|post| visible(post, include_unlisted))
            .cloned()
            .collect();
        newest_first(&mut posts);
        Ok(posts.iter().map(PostRecord::info).collect())
    }

    async fn search_posts(
        &self,
        query: &str,
        min_rank: f32,
        include_unlisted: bool,
    ) -> Result<Vec<PostInfo>, RepoError> {
        let posts = self.posts.lock().await;
        let mut ranked: Vec<(f32, &PostRecord)> = posts
            .iter()
            .filter(|post| visible(post, include_unlisted))
            .map(|post| (rank(post, query), post))
            .filter(|(rank, _)| *rank > min_rank)
            .collect();
        ranked.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| b.1.created.cmp(&a.1.created))
        });
        Ok(ranked.into_iter().map(|(_, post)| post.info()).collect())
    }

    async fn find_post(&self, id: &str) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .posts
            .lock()
            .await
            .iter()
            .find(|post| post.id == id)
            .cloned())
    }

    async fn list_post_ids(&self) -> Result<Vec<String>, RepoError> {
        Ok(self
            .posts
            .lock()
            .await
            .iter()
            .map(|post| post.id.clone())
            .collect())
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.lock().await;
        if posts.iter().any(|post| post.id == params.id) {
            return Err(RepoError::Duplicate {
                constraint: "posts_pkey".to_string(),
            });
        }
        let now = OffsetDateTime::now_utc();
        let record = PostRecord {
            id: params.id,
            post_type: params.post_type,
            unlisted: false,
            created: now,
            updated: now,
            title: params.title,
            description: params.description,
            content: params.content,
        };
        posts.push(record.clone());
        Ok(record)
    }

    async fn update_post(
        &self,
        params: UpdatePostParams,
    ) -> Result<Option<PostRecord>, RepoError> {
        let mut posts = self.posts.lock().await;
        if params.id != params.current_id && posts.iter().any(|post| post.id == params.id) {
            return Err(RepoError::Duplicate {
                constraint: "posts_pkey".to_string(),
            });
        }
        let Some(post) = posts.iter_mut().find(|post| post.id == params.current_id) else {
            return Ok(None);
        };
        post.id = params.id;
        post.post_type = params.post_type;
        post.unlisted = params.unlisted;
        post.title = params.title;
        post.description = params.description;
        post.content = params.content;
        post.updated = OffsetDateTime::now_utc();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: &str) -> Result<Option<PostRecord>, RepoError> {
        let mut posts = self.posts.lock().await;
        let index = posts.iter().position(|post| post.id == id);
        Ok(index.map(|index| posts.remove(index)))
    }
}

#[async_trait]
impl FeaturedRepo for MemoryRepositories {
    async fn list_featured_ids(&self) -> Result<Vec<String>, RepoError> {
        Ok(self.featured.lock().await.clone())
    }

    async fn list_featured_posts(
        &self,
        include_unlisted: bool,
    ) -> Result<Vec<PostInfo>, RepoError> {
        let featured = self.featured.lock().await.clone();
        let posts = self.posts.lock().await;
        Ok(featured
            .iter()
            .filter_map(|id| posts.iter().find(|post| &post.id == id))
            .filter(|post| visible(post, include_unlisted))
            .map(PostRecord::info)
            .collect())
    }

    async fn replace_featured_ids(&self, ids: &[String]) -> Result<(), RepoError> {
        *self.featured.lock().await = ids.to_vec();
        Ok(())
    }

    async fn rename_featured_id(&self, old_id: &str, new_id: &str) -> Result<(), RepoError> {
        for id in self.featured.lock().await.iter_mut() {
            if id == old_id {
                *id = new_id.to_string();
            }
        }
        Ok(())
    }

    async fn remove_featured_id(&self, id: &str) -> Result<(), RepoError> {
        self.featured.lock().await.retain(|featured| featured != id);
        Ok(())
    }
}

#[async_trait]
impl CredentialsRepo for MemoryRepositories {
    async fn load_password_hash(&self) -> Result<Option<String>, RepoError> {
        Ok(self.password_hash.lock().await.clone())
    }

    async fn store_password_hash(&self, hash: &str) -> Result<(), RepoError> {
        *self.password_hash.lock().await = Some(hash.to_string());
        Ok(())
    }
}

#[async_trait]
impl SessionsRepo for MemoryRepositories {
    async fn insert_session(&self, session: &SessionRecord) -> Result<(), RepoError> {
        self.sessions.lock().await.push(session.clone());
        Ok(())
    }

    async fn purge_sessions_before(&self, cutoff: OffsetDateTime) -> Result<u64, RepoError> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|session| session.created >= cutoff);
        Ok((before - sessions.len()) as u64)
    }

    async fn session_exists(&self, id: &str) -> Result<bool, RepoError> {
        Ok(self
            .sessions
            .lock()
            .await
            .iter()
            .any(|session| session.id == id))
    }

    async fn delete_session(&self, id: &str) -> Result<bool, RepoError> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|session| session.id != id);
        Ok(sessions.len() != before)
    }

    async fn delete_all_sessions(&self) -> Result<u64, RepoError> {
        let mut sessions = self.sessions.lock().await;
        let removed = sessions.len() as u64;
        sessions.clear();
        Ok(removed)
    }
}

/// In-memory object store that fails writes on demand.
#[derive(Clone)]
pub struct FlakyStore {
    inner: ObjectAttachmentStore,
    fail_puts: bool,
    fail_copies_of: Option<&'static str>,
}

impl FlakyStore {
    /// Every `put` fails with a backend error.
    pub fn failing_puts() -> Self {
        Self {
            inner: ObjectAttachmentStore::memory(),
            fail_puts: true,
            fail_copies_of: None,
        }
    }

    /// `copy` fails for source keys ending in `/{name}`.
    pub fn failing_copies_of(name: &'static str) -> Self {
        Self {
            inner: ObjectAttachmentStore::memory(),
            fail_puts: false,
            fail_copies_of: Some(name),
        }
    }
}

fn backend_failure() -> StorageError {
    StorageError::backend(std::io::Error::other("backend unavailable"))
}

#[async_trait]
impl AttachmentStore for FlakyStore {
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        self.inner.list(prefix).await
    }

    async fn head(&self, key: &str) -> Result<StoredObject, StorageError> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> Result<ObjectDownload, StorageError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        if self.fail_puts {
            return Err(backend_failure());
        }
        self.inner.put(key, data).await
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError> {
        if let Some(name) = self.fail_copies_of
            && from.ends_with(&format!("/{name}"))
        {
            return Err(backend_failure());
        }
        self.inner.copy(from, to).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(key).await
    }

    async fn delete_many(&self, keys: Vec<String>) -> Result<(), StorageError> {
        self.inner.delete_many(keys).await
    }
}

pub struct TestApp {
    pub router: Router,
    pub repos: Arc<MemoryRepositories>,
    pub attachments: AttachmentService,
}

pub async fn app() -> TestApp {
    app_with_limits(100).await
}

pub async fn app_with_limits(max_attempts: u32) -> TestApp {
    app_with(Arc::new(ObjectAttachmentStore::memory()), max_attempts).await
}

pub async fn app_with_store(store: Arc<dyn AttachmentStore>) -> TestApp {
    app_with(store, 100).await
}

/// Builds the post service the router uses, over `repos` and `attachments`.
pub fn post_service(repos: &Arc<MemoryRepositories>, attachments: AttachmentService) -> PostService {
    PostService::new(
        repos.clone(),
        repos.clone(),
        attachments,
        Bytes::from_static(DEFAULT_COVER_PNG),
        DEFAULT_MIN_RANK,
    )
}

async fn app_with(store: Arc<dyn AttachmentStore>, max_attempts: u32) -> TestApp {
    let repos = Arc::new(MemoryRepositories::default());
    let hash = hash_password(PASSWORD).expect("hash password");
    repos
        .store_password_hash(&hash)
        .await
        .expect("store password hash");

    let attachments = AttachmentService::new(store);
    let sessions = SessionService::new(repos.clone(), Duration::from_secs(86_400));
    let credentials = CredentialService::new(repos.clone(), sessions.clone());
    let posts = post_service(&repos, attachments.clone());

    let state = HttpState {
        credentials: Arc::new(credentials),
        sessions: Arc::new(sessions),
        posts: Arc::new(posts),
        attachments: Arc::new(attachments.clone()),
        attempts: AttemptLimiter::new(Duration::from_secs(60), max_attempts),
    };

    TestApp {
        router: build_router(state, MAX_UPLOAD_BYTES),
        repos,
        attachments,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Signs in with [`PASSWORD`] and returns the `session=<id>` cookie pair.
    pub async fn sign_in(&self) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/sign-in",
                None,
                serde_json::json!({ "password": PASSWORD }),
            ))
            .await;
        session_cookie(&response).expect("sign-in sets a session cookie")
    }

    /// Creates a post as `cookie` and returns its generated id.
    pub async fn create_post(&self, cookie: &str) -> String {
        let response = self.send(empty_request("POST", "/posts", Some(cookie))).await;
        let body = read_json(response).await;
        body["id"].as_str().expect("created id").to_string()
    }
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("valid request")
}

pub fn raw_request(
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: impl Into<Body>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(body.into()).expect("valid request")
}

pub async fn read_bytes(response: Response<Body>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = read_bytes(response).await;
    serde_json::from_slice(&bytes).expect("json body")
}

/// The `name=value` part of the session `Set-Cookie` header, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("session="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}
