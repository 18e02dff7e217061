#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sinfonia::{app::build_app, config::AppConfig, state::AppState};
use tower::ServiceExt;

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::new("integration-secret"))
    }

    pub fn with_config(cfg: AppConfig) -> Self {
        let state = AppState::in_memory(cfg);
        let router = build_app(state.clone());
        Self { state, router }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let (status, bytes) = self.send(req).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn register(&self, email: &str, is_admin: bool) -> StatusCode {
        let body = json!({
            "name": "Test User",
            "email": email,
            "password": "secret",
            "isAdmin": is_admin,
        });
        self.json("POST", "/auth/register", None, Some(body)).await.0
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        let body = json!({ "email": email, "password": password });
        self.json("POST", "/auth/login", None, Some(body)).await
    }

    /// Registers a plain user and returns its token.
    pub async fn user_token(&self, email: &str) -> String {
        assert_eq!(self.register(email, false).await, StatusCode::CREATED);
        let (status, body) = self.login(email, "secret").await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    /// Registers a user, promotes it out of band, and returns a fresh token.
    pub async fn admin_token(&self, email: &str) -> String {
        assert_eq!(self.register(email, false).await, StatusCode::CREATED);
        self.state.users.set_admin(email, true).await.unwrap();
        let (status, body) = self.login(email, "secret").await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }
}

pub const BOUNDARY: &str = "sinfonia-test-boundary";

pub fn multipart_request(
    token: Option<&str>,
    field: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload.bin\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut req = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    req.body(Body::from(body)).unwrap()
}
