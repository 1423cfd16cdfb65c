// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use academy_session::config::Config;
use academy_session::routes::create_router;
use academy_session::services::{AuthApiClient, RecordingNavigator, SessionManager};
use academy_session::store::{MemoryStore, SessionCookies, SessionStore, StoredSession};
use academy_session::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// A request received by the mock API.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub cookie: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    body: String,
    set_cookie: Option<String>,
}

#[derive(Clone, Default)]
struct MockState {
    responses: Arc<DashMap<String, MockResponse>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Platform API stand-in listening on an ephemeral local port.
///
/// Unconfigured paths answer 404 with a DRF-style `detail` body.
#[allow(dead_code)]
pub struct MockBackend {
    pub base_url: String,
    state: MockState,
}

#[allow(dead_code)]
impl MockBackend {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api", addr),
            state,
        }
    }

    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.respond_raw(path, status, &body.to_string());
    }

    pub fn respond_raw(&self, path: &str, status: u16, body: &str) {
        self.insert(path, status, body, None);
    }

    pub fn respond_with_cookie(&self, path: &str, status: u16, body: Value, set_cookie: &str) {
        self.insert(path, status, &body.to_string(), Some(set_cookie.to_string()));
    }

    fn insert(&self, path: &str, status: u16, body: &str, set_cookie: Option<String>) {
        self.state.responses.insert(
            format!("/api{}", path),
            MockResponse {
                status: StatusCode::from_u16(status).unwrap(),
                body: body.to_string(),
                set_cookie,
            },
        );
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        let full = format!("/api{}", path);
        self.requests()
            .into_iter()
            .filter(|r| r.path == full)
            .collect()
    }
}

async fn handle(State(state): State<MockState>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let authorization = header_str(request.headers(), header::AUTHORIZATION);
    let cookie = header_str(request.headers(), header::COOKIE);

    let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    state.requests.lock().unwrap().push(RecordedRequest {
        path: path.clone(),
        authorization,
        cookie,
        body,
    });

    match state.responses.get(&path).map(|r| r.value().clone()) {
        Some(mock) => {
            let mut response = (mock.status, mock.body).into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            if let Some(cookie) = mock.set_cookie {
                response
                    .headers_mut()
                    .insert(header::SET_COOKIE, HeaderValue::from_str(&cookie).unwrap());
            }
            response
        }
        None => (StatusCode::NOT_FOUND, r#"{"detail":"Not found."}"#).into_response(),
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Base URL on which nothing is listening.
#[allow(dead_code)]
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/api", port)
}

/// Session manager backed by in-memory storage, talking to `base_url`.
#[allow(dead_code)]
pub fn manager_for(base_url: &str) -> (SessionManager, Arc<RecordingNavigator>) {
    let cookies = Arc::new(SessionCookies::new());
    let store = SessionStore::new(Arc::new(MemoryStore::new()), cookies.clone(), 86400);
    let api = AuthApiClient::new(base_url, cookies).expect("Failed to build API client");
    let navigator = Arc::new(RecordingNavigator::new());
    let manager = SessionManager::new(api, store, navigator.clone(), "/login");
    (manager, navigator)
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    iat: i64,
}

/// Signed HS256 token expiring `ttl_secs` from now (negative for expired).
#[allow(dead_code)]
pub fn mint_token(user_id: u64, ttl_secs: i64) -> String {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + ttl_secs,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"test_signing_key_32_bytes_long!!"),
    )
    .expect("Failed to create JWT")
}

/// `{user, tokens}` body as returned by login and registration.
#[allow(dead_code)]
pub fn auth_body(user_id: u64, email: &str, access: &str, refresh: &str) -> Value {
    serde_json::json!({
        "user": {"id": user_id, "email": email, "role": "student", "xp": 40},
        "tokens": {"access": access, "refresh": refresh}
    })
}

/// Put a session straight into the manager's store.
#[allow(dead_code)]
pub fn seed_session(manager: &SessionManager, user_id: u64, access: &str, refresh: Option<&str>) {
    let user = serde_json::from_value(serde_json::json!({
        "id": user_id,
        "email": "seeded@academy.test",
        "role": "student"
    }))
    .unwrap();
    manager
        .store()
        .persist(&StoredSession {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
            user,
        })
        .expect("Failed to seed session");
}

/// Session gate router with test configuration.
#[allow(dead_code)]
pub fn create_test_gate() -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        config: Config::default(),
    });
    (create_router(state.clone()), state)
}
