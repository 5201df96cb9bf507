//! Shared fixtures: a stand-in phpIPAM server and an in-process ipamsrv

#![allow(dead_code)]
#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, Uri},
    Json, Router,
};
use ipamsrv::{bootstrap, routes::create_routes, AppState, IpamsrvConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const APP_ID: &str = "console";
pub const APP_CODE: &str = "secret";

type Responses = Arc<Mutex<HashMap<String, (StatusCode, Value)>>>;

/// phpIPAM stand-in; endpoints without a scripted answer get phpIPAM's 404
pub struct FakePhpIpam {
    pub base_url: String,
    responses: Responses,
}

async fn answer(State(responses): State<Responses>, uri: Uri) -> (StatusCode, Json<Value>) {
    let prefix = format!("/api/{}/", APP_ID);
    let endpoint = uri.path().strip_prefix(&prefix).unwrap_or(uri.path());
    let scripted = responses.lock().unwrap().get(endpoint).cloned();
    match scripted {
        Some((status, body)) => (status, Json(body)),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"code": 404, "success": false, "message": "Not found"})),
        ),
    }
}

impl FakePhpIpam {
    pub async fn start() -> Self {
        let responses: Responses = Arc::default();
        let app = Router::new()
            .fallback(answer)
            .with_state(responses.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api", addr),
            responses,
        }
    }

    pub fn respond(&self, endpoint: &str, status: StatusCode, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), (status, body));
    }

    /// `{code: 200, success: true, data}`
    pub fn respond_data(&self, endpoint: &str, data: Value) {
        self.respond(
            endpoint,
            StatusCode::OK,
            json!({"code": 200, "success": true, "data": data}),
        );
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub phpipam: FakePhpIpam,
    _dir: TempDir,
}

impl TestApp {
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = IpamsrvConfig::default();
        config.database.path = dir.path().join("ipamsrv.db").to_string_lossy().to_string();
        config.phpipam.timeout_ms = 2000;
        config.probe.timeout_ms = 1000;

        let state = bootstrap::create_app_state(config).await.unwrap();
        Self {
            router: create_routes(state.clone()),
            state,
            phpipam: FakePhpIpam::start().await,
            _dir: dir,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        json_request(&self.router, method, uri, body).await
    }

    /// Register a connector pointing at the fake server and return its id
    pub async fn create_connector(&self) -> i64 {
        let (status, body) = self
            .request(Method::POST, "/api/ipams", Some(self.connector_body("Lab IPAM")))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["ipam"]["id"].as_i64().unwrap()
    }

    pub fn connector_body(&self, name: &str) -> Value {
        json!({
            "name": name,
            "baseUrl": self.phpipam.base_url,
            "appId": APP_ID,
            "appCode": APP_CODE
        })
    }
}

/// Send one request through the router and decode the JSON answer
pub async fn json_request(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };
    (status, value)
}
