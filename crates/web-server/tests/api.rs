//! Route tests against a live PostgreSQL database.
//!
//! Each test resets the schema and drives the router in-process. They are
//! ignored by default; run them with
//!
//! ```text
//! TEST_DATABASE_URL=postgresql:///warbler-test cargo test -p web-server -- --ignored
//! ```

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use configuration::{AuthSettings, DatabaseSettings};
use database::{DbRepository, connect, reset_schema};
use serde_json::{Value, json};
use serial_test::serial;
use std::sync::Arc;
use tower::ServiceExt;
use web_server::{AppState, router};

const DEFAULT_TEST_DATABASE_URL: &str = "postgresql:///warbler-test";

async fn app() -> Router {
    let url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| DEFAULT_TEST_DATABASE_URL.to_string());
    let settings = DatabaseSettings { url, max_connections: 5, ..Default::default() };

    let pool = connect(&settings).await.expect("connect to the test database");
    reset_schema(&pool).await.expect("reset schema");

    router(Arc::new(AppState {
        db_repo: DbRepository::new(pool),
        auth: AuthSettings { bcrypt_cost: 4 },
    }))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

async fn signup(app: &Router, username: &str, password: &str) -> i32 {
    let body = json!({
        "username": username,
        "email": format!("{username}@email.com"),
        "password": password,
    });
    let (status, user) = send(app, Method::POST, "/api/users", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "signup {username}: {user}");
    user["id"].as_i64().expect("user id") as i32
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn signup_creates_user_without_exposing_password() {
    let app = app().await;

    let body = json!({ "username": "testuser1", "email": "test1@email.com", "password": "password1" });
    let (status, user) = send(&app, Method::POST, "/api/users", Some(body)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["username"], "testuser1");
    assert_eq!(user["image_url"], "/static/images/default-pic.png");
    assert!(user.get("password").is_none());
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn duplicate_or_missing_username_conflicts() {
    let app = app().await;
    signup(&app, "testuser1", "password1").await;

    let duplicate = json!({ "username": "testuser1", "email": "other@email.com", "password": "pw" });
    let (status, body) = send(&app, Method::POST, "/api/users", Some(duplicate)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflicts with existing data (users_username_key)");

    let missing = json!({ "email": "noname@email.com", "password": "pw" });
    let (status, _) = send(&app, Method::POST, "/api/users", Some(missing)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn login_accepts_only_correct_credentials() {
    let app = app().await;
    let id = signup(&app, "testuser1", "password1").await;

    let good = json!({ "username": "testuser1", "password": "password1" });
    let (status, user) = send(&app, Method::POST, "/api/login", Some(good)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["id"], id);

    let wrong_password = json!({ "username": "testuser1", "password": "badpassword" });
    let (status, _) = send(&app, Method::POST, "/api/login", Some(wrong_password)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let unknown = json!({ "username": "badusername", "password": "password1" });
    let (status, _) = send(&app, Method::POST, "/api/login", Some(unknown)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn follow_and_unfollow_through_the_api() {
    let app = app().await;
    let u1 = signup(&app, "testuser1", "password1").await;
    let u2 = signup(&app, "testuser2", "password2").await;

    let edge = format!("/api/users/{u1}/following/{u2}");
    let (status, _) = send(&app, Method::POST, &edge, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, following) = send(&app, Method::GET, &format!("/api/users/{u1}/following"), None).await;
    assert_eq!(following[0]["id"], u2);
    let (_, followers) = send(&app, Method::GET, &format!("/api/users/{u2}/followers"), None).await;
    assert_eq!(followers[0]["id"], u1);
    let (_, reverse) = send(&app, Method::GET, &format!("/api/users/{u2}/following"), None).await;
    assert_eq!(reverse, json!([]));

    let (status, _) = send(&app, Method::DELETE, &edge, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, following) = send(&app, Method::GET, &format!("/api/users/{u1}/following"), None).await;
    assert_eq!(following, json!([]));
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn follow_errors_map_to_status_codes() {
    let app = app().await;
    let u1 = signup(&app, "testuser1", "password1").await;

    let (status, _) = send(&app, Method::POST, &format!("/api/users/{u1}/following/99"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) =
        send(&app, Method::POST, &format!("/api/users/{u1}/following/{u1}"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Rejected by a check constraint (follows_no_self_follow)");

    let (status, _) = send(&app, Method::GET, "/api/users/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn messages_likes_and_timeline() {
    let app = app().await;
    let u1 = signup(&app, "testuser1", "password1").await;
    let u2 = signup(&app, "testuser2", "password2").await;

    let (status, message) = send(
        &app,
        Method::POST,
        &format!("/api/users/{u2}/messages"),
        Some(json!({ "text": "hello warbler" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let message_id = message["id"].as_i64().unwrap();

    let like = format!("/api/users/{u1}/likes/{message_id}");
    let (status, _) = send(&app, Method::POST, &like, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, profile) = send(&app, Method::GET, &format!("/api/users/{u1}"), None).await;
    assert_eq!(profile["liked_message_ids"], json!([message_id]));

    let (status, _) = send(&app, Method::POST, &format!("/api/users/{u1}/likes/424242"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Not following yet: the message stays off the timeline.
    let timeline = format!("/api/users/{u1}/timeline");
    let (_, messages) = send(&app, Method::GET, &timeline, None).await;
    assert_eq!(messages, json!([]));

    send(&app, Method::POST, &format!("/api/users/{u1}/following/{u2}"), None).await;
    let (status, messages) = send(&app, Method::GET, &format!("{timeline}?limit=-5"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages.as_array().unwrap().len(), 1);
    assert_eq!(messages[0]["text"], "hello warbler");

    let (status, _) = send(&app, Method::DELETE, &like, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, profile) = send(&app, Method::GET, &format!("/api/users/{u1}"), None).await;
    assert_eq!(profile["liked_message_ids"], json!([]));
}
