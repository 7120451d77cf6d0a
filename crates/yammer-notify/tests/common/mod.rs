//! Test utilities: an in-process mock of the Yammer REST API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use yammer_notify::config::ApiConfig;
use yammer_notify::{AccessToken, ApiClient};

/// Token the mock accepts.
pub const TEST_TOKEN: &str = "test-token";

#[derive(Default)]
struct MockState {
    current_user: Option<i64>,
    users: HashMap<i64, Value>,
    groups: HashMap<i64, Vec<Value>>,
    /// Messages by feed key ("private" or the group id), oldest first.
    feeds: HashMap<String, Vec<Value>>,
    feed_status: HashMap<String, StatusCode>,
    avatars: HashMap<i64, Vec<u8>>,
    hits: HashMap<String, usize>,
}

type Shared = Arc<Mutex<MockState>>;

/// A running mock API server on an OS-assigned loopback port.
pub struct MockYammer {
    addr: SocketAddr,
    state: Shared,
}

impl MockYammer {
    pub async fn start() -> Self {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/api/v1/users/{file}", get(user))
            .route("/api/v1/groups/for_user/{file}", get(groups))
            .route("/api/v1/messages/private.json", get(private_messages))
            .route("/api/v1/messages/in_group/{file}", get(group_messages))
            .route("/avatars/{id}", get(avatar))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api/v1/", self.addr)
    }

    pub fn avatar_url(&self, id: i64) -> String {
        format!("http://{}/avatars/{id}", self.addr)
    }

    pub fn client(&self) -> ApiClient {
        self.client_with_token(TEST_TOKEN)
    }

    pub fn client_with_token(&self, token: &str) -> ApiClient {
        let config = ApiConfig {
            base_url: self.base_url(),
            timeout_secs: 5,
            ..ApiConfig::default()
        };
        ApiClient::new(&config, AccessToken::new(token)).unwrap()
    }

    /// Register a user named "User {id}" with a small avatar. Optional
    /// profile fields are sent as `null`, like the real API does.
    pub fn add_user(&self, id: i64) {
        let profile = json!({
            "type": "user",
            "id": id,
            "state": "active",
            "name": format!("user{id}"),
            "full_name": format!("User {id}"),
            "job_title": null,
            "location": null,
            "mugshot_url": self.avatar_url(id),
        });
        let mut state = self.lock();
        state.users.insert(id, profile);
        state.avatars.insert(id, format!("avatar-{id}").into_bytes());
    }

    /// Make `id` the authenticated user, member of `groups` (id, name).
    pub fn set_current_user(&self, id: i64, groups: &[(i64, &str)]) {
        self.add_user(id);
        let groups = groups
            .iter()
            .map(|(gid, name)| {
                json!({ "type": "group", "id": gid, "full_name": name, "description": null })
            })
            .collect();
        let mut state = self.lock();
        state.current_user = Some(id);
        state.groups.insert(id, groups);
    }

    pub fn remove_avatar(&self, id: i64) {
        self.lock().avatars.remove(&id);
    }

    /// Append messages `(id, sender_id, body)` to a feed; ids must ascend.
    pub fn push_messages(&self, feed: &str, messages: &[(i64, i64, &str)]) {
        let mut state = self.lock();
        let list = state.feeds.entry(feed.to_string()).or_default();
        for (id, sender, body) in messages {
            list.push(json!({
                "id": id,
                "sender_id": sender,
                "thread_id": id,
                "sender_type": "user",
                "created_at": null,
                "web_url": null,
                "body": { "plain": body },
            }));
        }
    }

    /// Answer every request for `feed` with `status` from now on.
    pub fn fail_feed(&self, feed: &str, status: StatusCode) {
        self.lock().feed_status.insert(feed.to_string(), status);
    }

    /// Requests seen for `path` (e.g. `/api/v1/users/2.json`).
    pub fn hits(&self, path: &str) -> usize {
        self.lock().hits.get(path).copied().unwrap_or_default()
    }
}

#[derive(serde::Deserialize)]
struct FeedQuery {
    limit: Option<usize>,
    newer_than: Option<i64>,
}

fn record(state: &Shared, uri: &Uri) {
    *state
        .lock()
        .unwrap()
        .hits
        .entry(uri.path().to_string())
        .or_default() += 1;
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TEST_TOKEN}"))
}

fn json_id(file: &str) -> Option<&str> {
    file.strip_suffix(".json")
}

async fn user(
    State(state): State<Shared>,
    Path(file): Path<String>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    record(&state, &uri);
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let state = state.lock().unwrap();
    let id = match json_id(&file) {
        Some("current") => state.current_user,
        Some(id) => id.parse().ok(),
        None => None,
    };
    match id.and_then(|id| state.users.get(&id)) {
        Some(profile) => axum::Json(profile.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn groups(
    State(state): State<Shared>,
    Path(file): Path<String>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    record(&state, &uri);
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let state = state.lock().unwrap();
    let groups = json_id(&file)
        .and_then(|id| id.parse::<i64>().ok())
        .and_then(|id| state.groups.get(&id));
    match groups {
        Some(groups) => axum::Json(Value::Array(groups.clone())).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn private_messages(
    State(state): State<Shared>,
    Query(query): Query<FeedQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    record(&state, &uri);
    feed_response(&state, "private", &query, &headers)
}

async fn group_messages(
    State(state): State<Shared>,
    Path(file): Path<String>,
    Query(query): Query<FeedQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    record(&state, &uri);
    match json_id(&file) {
        Some(id) => feed_response(&state, id, &query, &headers),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Newest first, like the real API.
fn feed_response(state: &Shared, key: &str, query: &FeedQuery, headers: &HeaderMap) -> Response {
    if !authorized(headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let state = state.lock().unwrap();
    if let Some(status) = state.feed_status.get(key) {
        return (*status, "feed unavailable").into_response();
    }

    let all = state.feeds.get(key).cloned().unwrap_or_default();
    let mut messages: Vec<Value> = all
        .into_iter()
        .rev()
        .filter(|m| match query.newer_than {
            Some(cursor) => m["id"].as_i64().is_some_and(|id| id > cursor),
            None => true,
        })
        .collect();
    if let Some(limit) = query.limit {
        messages.truncate(limit);
    }

    axum::Json(json!({
        "messages": messages,
        "meta": { "older_available": false, "feed_name": key },
    }))
    .into_response()
}

async fn avatar(State(state): State<Shared>, Path(id): Path<i64>, uri: Uri) -> Response {
    record(&state, &uri);
    let state = state.lock().unwrap();
    match state.avatars.get(&id) {
        Some(bytes) => ([(header::CONTENT_TYPE, "image/jpeg")], bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
