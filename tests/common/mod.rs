#![allow(dead_code)]

use std::sync::{Arc, Once};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;

use liftlog::api::{create_routes, AppState};
use liftlog::auth::{hash_password, UserRole};
use liftlog::config::{AppConfig, UploadConfig};
use liftlog::models::{NewUser, User, UserProfile};
use liftlog::repositories::{Repositories, UserRepository};
use liftlog::test_utils::{
    FakeVideoProcessor, InMemoryObjectStorage, InMemoryProgressRepository, InMemoryUserRepository,
    InMemoryVideoRepository, InMemoryWorkoutRepository,
};

pub const PASSWORD: &str = "secret123";
pub const BOUNDARY: &str = "liftlog-test-boundary";

static INIT: Once = Once::new();

/// Initialize test logging
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("liftlog=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Full router over in-memory repositories, storage and a fake ffmpeg
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub users: Arc<InMemoryUserRepository>,
    pub videos: Arc<InMemoryVideoRepository>,
    pub storage: Arc<InMemoryObjectStorage>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_upload_config(UploadConfig::default())
    }

    pub fn with_upload_config(upload_config: UploadConfig) -> Self {
        init_test_logging();

        let users = Arc::new(InMemoryUserRepository::new());
        let videos = Arc::new(InMemoryVideoRepository::new());
        let storage = Arc::new(InMemoryObjectStorage::new());
        let repositories = Repositories {
            users: users.clone(),
            workouts: Arc::new(InMemoryWorkoutRepository::new()),
            progress: Arc::new(InMemoryProgressRepository::new()),
            videos: videos.clone(),
        };
        let config = AppConfig {
            bcrypt_cost: 4,
            ..Default::default()
        };

        let state = AppState::new(
            repositories,
            storage.clone(),
            Arc::new(FakeVideoProcessor::default()),
            &config,
            upload_config,
        );

        Self {
            router: create_routes(state.clone()),
            state,
            users,
            videos,
            storage,
        }
    }

    /// Insert a user directly and issue a token for it
    pub async fn user(&self, role: UserRole, is_approved: bool) -> (User, String) {
        let now = Utc::now();
        let tag = uuid::Uuid::new_v4().simple().to_string();
        let user = self
            .users
            .create(NewUser {
                username: format!("{}_{}", role.as_str(), &tag[..8]),
                email: format!("{}@example.com", &tag[..12]),
                password_hash: hash_password(PASSWORD, 4).expect("hash password"),
                role,
                membership_start: now,
                membership_expiration: now + Duration::days(30),
                is_email_verified: true,
                is_approved,
                profile: UserProfile::default(),
            })
            .await
            .expect("create user");

        let token = self
            .state
            .auth
            .jwt()
            .create_token(user.id, user.role)
            .expect("create token");
        (user, token)
    }

    pub async fn member(&self) -> (User, String) {
        self.user(UserRole::Member, true).await
    }

    pub async fn trainer(&self) -> (User, String) {
        self.user(UserRole::Trainer, true).await
    }

    pub async fn admin(&self) -> (User, String) {
        self.user(UserRole::Admin, true).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("router call");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(json_request(Method::GET, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::PATCH, uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(json_request(Method::DELETE, uri, token, None)).await
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request")
}

/// A file part for `multipart_body`
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

pub fn multipart_body(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes());
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some(file) = file {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                file.field, file.file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.content_type).as_bytes());
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .expect("build multipart request")
}
