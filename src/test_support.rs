//! Shared fixtures for router tests: an app over `MemoryStore`, a media store
//! that records uploads, and HS256 tokens signed with a test secret.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::app_state::AppState;
use crate::auth::jwt::{Claims, AUDIENCE};
use crate::auth::{JwtVerifier, Metadata};
use crate::media::{MediaError, MediaStore};
use crate::routes::router;
use crate::supabase::{MemoryStore, Row};

pub const TEST_JWT_SECRET: &str = "estato-test-secret-with-enough-length";

pub fn mint_token(sub: &str, role: Option<&str>, ttl_secs: i64) -> String {
    sign(&claims_for(sub, role, ttl_secs))
}

pub fn claims_for(sub: &str, role: Option<&str>, ttl_secs: i64) -> Claims {
    Claims {
        sub: sub.to_string(),
        exp: (Utc::now().timestamp() + ttl_secs) as usize,
        aud: AUDIENCE.to_string(),
        email: Some(format!("{}@estato.test", sub)),
        role: Some("authenticated".to_string()),
        app_metadata: Metadata {
            role: role.map(str::to_owned),
        },
        user_metadata: Metadata::default(),
    }
}

pub fn sign(claims: &Claims) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

#[derive(Default)]
pub struct RecordingMedia {
    /// `(key, content_type, size)` of every stored object.
    pub uploads: Mutex<Vec<(String, String, usize)>>,
}

#[async_trait]
impl MediaStore for RecordingMedia {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, MediaError> {
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string(), bytes.len()));
        Ok(format!("https://media.estato.test/{}", key))
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub media: Arc<RecordingMedia>,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(true)
    }

    pub async fn without_media() -> Self {
        Self::build(false)
    }

    fn build(with_media: bool) -> Self {
        let store = Arc::new(MemoryStore::new());
        let media = Arc::new(RecordingMedia::default());
        let state = AppState {
            store: store.clone(),
            media: if with_media {
                Some(media.clone() as Arc<dyn MediaStore>)
            } else {
                None
            },
            verifier: Arc::new(JwtVerifier::new(TEST_JWT_SECRET)),
        };

        Self {
            store,
            media,
            router: router(Arc::new(state), &[]),
        }
    }

    pub fn admin_token() -> String {
        mint_token("admin-1", Some("admin"), 3600)
    }

    pub async fn seed(&self, table: &str, rows: Vec<Value>) {
        let rows: Vec<Row> = rows
            .into_iter()
            .map(|value| value.as_object().cloned().unwrap())
            .collect();
        self.store.seed(table, rows).await;
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn patch(
        &self,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.request(Method::PATCH, path, token, body).await
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Parses a JSON body; non-JSON bodies come back as a string value.
pub async fn body_json(response: Response) -> Value {
    let bytes = body_bytes(response).await;
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes).to_string()))
}
