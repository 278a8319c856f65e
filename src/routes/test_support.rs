//! Shared fixtures for handler tests.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::{hash_password, Authenticator, Identity, JwtAuthenticator};
use crate::config::JwtConfig;
use crate::db::memory::MemoryStore;
use crate::db::models::{Blog, BlogImage, Category, NewAdmin, NewBlog, NewCategory};
use crate::db::{AdminStore, BlogStore, CategoryStore};
use crate::media::memory::MemoryImageHost;
use crate::state::AppState;

pub const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
const BOUNDARY: &str = "blog-backend-test-boundary";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub images: Arc<MemoryImageHost>,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let images = Arc::new(MemoryImageHost::new());
        let auth = Arc::new(JwtAuthenticator::new(&JwtConfig {
            secret: "test-secret".to_string(),
            expiry_hours: 1,
        }));
        let token = auth
            .issue_token(&Identity {
                id: Uuid::new_v4(),
                email: "admin@example.com".to_string(),
            })
            .unwrap();

        let state = AppState::new(store.clone(), images.clone(), auth);
        let app = crate::create_app(state.clone(), 32 * 1024 * 1024);

        Self {
            app,
            state,
            store,
            images,
            token,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        send(&self.app, req).await
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub async fn seed_admin(&self, email: &str, password: &str) {
        let password_hash = hash_password(password.to_string()).await.unwrap();
        self.store
            .create_admin(NewAdmin {
                email: email.to_string(),
                password_hash,
            })
            .await
            .unwrap();
    }

    pub async fn seed_category(&self, name: &str) -> Category {
        self.store
            .create_category(NewCategory {
                name: name.to_string(),
                description: None,
            })
            .await
            .unwrap()
    }

    pub async fn seed_blog(&self, category: Uuid, title: &str, content: &str) -> Blog {
        self.store
            .create_blog(NewBlog {
                title: title.to_string(),
                description: format!("About {title}"),
                content: content.to_string(),
                category,
                author: "Ada".to_string(),
                images: Vec::new(),
            })
            .await
            .unwrap()
    }

    pub async fn seed_blog_with_images(&self, category: Uuid, images: &[&str]) -> Blog {
        self.store
            .create_blog(NewBlog {
                title: "With images".to_string(),
                description: "d".to_string(),
                content: "c".to_string(),
                category,
                author: "Ada".to_string(),
                images: images
                    .iter()
                    .map(|id| BlogImage {
                        url: format!("https://images.test/{id}"),
                        public_id: id.to_string(),
                    })
                    .collect(),
            })
            .await
            .unwrap()
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json(method: Method, uri: &str, body: Value, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a `multipart/form-data` request from text fields and
/// `(field, file name, bytes)` files.
pub fn multipart(
    method: Method,
    uri: &str,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
    auth: Option<&str>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body)).unwrap()
}
