#![allow(dead_code)]

//! In-memory stand-in for the REST backend.
//!
//! Behaves like the production service: ids start at 1, `user_name` is
//! unique on create (409), an empty directory lists as `null`, update echoes
//! the submitted record and delete answers 204.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use tokio::task::JoinHandle;
use url::Url;

use user_directory::{RestUserDirectory, TracedClient, User, UserFields, UserId};

#[derive(Default)]
struct Store {
    next_id: i64,
    users: Vec<User>,
}

type Shared = Arc<Mutex<Store>>;

pub struct TestBackend {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl TestBackend {
    pub fn directory(&self) -> RestUserDirectory {
        directory_at(&self.base_url)
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn directory_at(base_url: &str) -> RestUserDirectory {
    RestUserDirectory::new(TracedClient::default(), Url::parse(base_url).unwrap())
}

/// A loopback port with nothing listening on it.
pub fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub async fn spawn_backend() -> TestBackend {
    let store: Shared = Arc::new(Mutex::new(Store {
        next_id: 1,
        users: Vec::new(),
    }));

    let app = Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", put(update_user).delete(delete_user))
        .with_state(store);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestBackend {
        base_url: format!("http://{addr}"),
        handle,
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn parse_id(raw: &str) -> Option<UserId> {
    raw.parse().ok()
}

async fn list_users(State(store): State<Shared>) -> Response {
    let store = store.lock().unwrap();
    if store.users.is_empty() {
        return Json(serde_json::Value::Null).into_response();
    }
    Json(store.users.clone()).into_response()
}

async fn create_user(
    State(store): State<Shared>,
    payload: Result<Json<UserFields>, JsonRejection>,
) -> Response {
    let Ok(Json(fields)) = payload else {
        return error(StatusCode::BAD_REQUEST, "Invalid input");
    };
    if fields.user_name.is_empty() || fields.email.is_empty() {
        return error(StatusCode::BAD_REQUEST, "User name and email are required");
    }

    let mut store = store.lock().unwrap();
    if store.users.iter().any(|u| u.user_name == fields.user_name) {
        return error(StatusCode::CONFLICT, "User already exists");
    }

    let user = User {
        id: UserId(store.next_id),
        user_name: fields.user_name,
        email: fields.email,
    };
    store.next_id += 1;
    store.users.push(user.clone());
    (StatusCode::CREATED, Json(user)).into_response()
}

async fn update_user(
    State(store): State<Shared>,
    Path(raw_id): Path<String>,
    payload: Result<Json<UserFields>, JsonRejection>,
) -> Response {
    let Some(id) = parse_id(&raw_id) else {
        return error(StatusCode::BAD_REQUEST, "Invalid user ID");
    };
    let Ok(Json(fields)) = payload else {
        return error(StatusCode::BAD_REQUEST, "Invalid input");
    };

    let mut store = store.lock().unwrap();
    // Unique index violation on rename surfaces as a generic failure.
    if store
        .users
        .iter()
        .any(|u| u.id != id && u.user_name == fields.user_name)
    {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update user");
    }

    let user = User {
        id,
        user_name: fields.user_name,
        email: fields.email,
    };
    if let Some(existing) = store.users.iter_mut().find(|u| u.id == id) {
        *existing = user.clone();
    }
    Json(user).into_response()
}

async fn delete_user(State(store): State<Shared>, Path(raw_id): Path<String>) -> Response {
    let Some(id) = parse_id(&raw_id) else {
        return error(StatusCode::BAD_REQUEST, "Invalid user ID");
    };
    store.lock().unwrap().users.retain(|u| u.id != id);
    StatusCode::NO_CONTENT.into_response()
}
