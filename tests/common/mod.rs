#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bootcamp_api::config::AppConfig;
use bootcamp_api::database::models::Role;
use bootcamp_api::database::{Collection, Document, DocumentStore, MemoryStore};
use bootcamp_api::services::geocoder::{GeoLocation, StaticGeocoder};
use bootcamp_api::services::mailer::MemoryMailer;
use bootcamp_api::state::AppState;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "123456";

/// One in-process application with a fixed geocoder, a recording mailer
/// and a throwaway uploads directory. The store is in-memory unless the
/// test supplies one.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn DocumentStore>,
    pub mailer: Arc<MemoryMailer>,
    pub uploads: TempDir,
}

pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
    pub cookie: Option<String>,
}

pub fn boston() -> GeoLocation {
    GeoLocation {
        latitude: 42.350846,
        longitude: -71.104028,
        formatted_address: "233 Bay State Rd, Boston, MA 02215-1405, US".into(),
        street: Some("233 Bay State Rd".into()),
        city: Some("Boston".into()),
        state: Some("MA".into()),
        zipcode: Some("02215-1405".into()),
        country: Some("US".into()),
    }
}

pub fn lowell() -> GeoLocation {
    GeoLocation {
        latitude: 42.6392,
        longitude: -71.324812,
        formatted_address: "220 Pawtucket St, Lowell, MA 01854-3558, US".into(),
        street: Some("220 Pawtucket St".into()),
        city: Some("Lowell".into()),
        state: Some("MA".into()),
        zipcode: Some("01854-3558".into()),
        country: Some("US".into()),
    }
}

pub fn burlington() -> GeoLocation {
    GeoLocation {
        latitude: 44.477935,
        longitude: -73.196589,
        formatted_address: "85 S Prospect St, Burlington, VT 05405-1703, US".into(),
        street: Some("85 S Prospect St".into()),
        city: Some("Burlington".into()),
        state: Some("VT".into()),
        zipcode: Some("05405-1703".into()),
        country: Some("US".into()),
    }
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn DocumentStore>) -> Result<Self> {
        let uploads = tempfile::tempdir().context("failed to create uploads dir")?;
        let mut config = AppConfig::development();
        config.uploads.path = uploads.path().to_path_buf();
        config.uploads.max_file_upload = 1024;

        let mailer = Arc::new(MemoryMailer::new());
        let geocoder = StaticGeocoder::new()
            .with("02215", boston())
            .with("01854", lowell())
            .with("05405", burlington());

        let state = AppState::new(config, store.clone(), Arc::new(geocoder), mailer.clone())?;
        Ok(Self { router: bootcamp_api::app(state), store, mailer, uploads })
    }

    pub async fn send(&self, request: Request<Body>) -> Result<Reply> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok(Reply { status, body, cookie })
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<Reply> {
        self.send(request(Method::GET, uri, token, None)?).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Result<Reply> {
        self.send(request(Method::DELETE, uri, token, None)?).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<Reply> {
        self.send(request(Method::POST, uri, token, Some(body))?).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Result<Reply> {
        self.send(request(Method::PUT, uri, token, Some(body))?).await
    }

    /// Register through the API and return the session token
    pub async fn register(&self, name: &str, email: &str, role: &str) -> Result<String> {
        let reply = self
            .post(
                "/api/v1/auth/register",
                None,
                json!({"name": name, "email": email, "password": PASSWORD, "role": role}),
            )
            .await?;
        anyhow::ensure!(reply.status == StatusCode::OK, "register failed: {}", reply.body);
        token_of(&reply)
    }

    /// Register as a plain user, then promote to admin directly in the store
    pub async fn admin(&self) -> Result<String> {
        let token = self.register("Admin Account", "admin@gmail.com", "user").await?;
        let me = self.get("/api/v1/auth/me", Some(&token)).await?;
        let id = me.body["data"]["id"].as_str().context("me without id")?.to_string();

        let mut changes = Document::new();
        changes.insert("role".into(), Value::String(Role::Admin.to_string()));
        self.store.update(Collection::Users, &id, changes).await?;
        Ok(token)
    }

    pub async fn publisher(&self, name: &str) -> Result<String> {
        let email = format!("{}@gmail.com", name.to_lowercase().replace(' ', "."));
        self.register(name, &email, "publisher").await
    }

    /// Create a bootcamp and return its id
    pub async fn bootcamp(&self, token: &str, name: &str, address: &str) -> Result<String> {
        let reply = self.post("/api/v1/bootcamps", Some(token), bootcamp_body(name, address)).await?;
        anyhow::ensure!(reply.status == StatusCode::CREATED, "create bootcamp failed: {}", reply.body);
        id_of(&reply)
    }

    /// Add a course and return its id
    pub async fn course(&self, token: &str, bootcamp_id: &str, title: &str, tuition: u32) -> Result<String> {
        let reply = self
            .post(&format!("/api/v1/bootcamps/{}/courses", bootcamp_id), Some(token), course_body(title, tuition))
            .await?;
        anyhow::ensure!(reply.status == StatusCode::CREATED, "create course failed: {}", reply.body);
        id_of(&reply)
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };
    Ok(request)
}

pub fn bootcamp_body(name: &str, address: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{} teaches full stack web development", name),
        "website": "https://example.com",
        "phone": "(111) 111-1111",
        "email": "enroll@example.com",
        "address": address,
        "careers": ["Web Development", "UI/UX"],
        "housing": true,
        "job_assistance": true,
        "job_guarantee": false,
        "accept_gi": true
    })
}

pub fn course_body(title: &str, tuition: u32) -> Value {
    json!({
        "title": title,
        "description": format!("{} course", title),
        "weeks": 8,
        "tuition": tuition,
        "minimum_skill": "beginner",
        "scholarship_available": false
    })
}

pub fn token_of(reply: &Reply) -> Result<String> {
    reply.body["token"]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("response without token: {}", reply.body))
}

pub fn id_of(reply: &Reply) -> Result<String> {
    reply.body["data"]["id"]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("response without data.id: {}", reply.body))
}

pub fn error_of(reply: &Reply) -> &str {
    reply.body["error"].as_str().unwrap_or_default()
}
