use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use sakina_api::routes::router;
use sakina_api::state::AppStateInner;
use sakina_db::Database;

fn app() -> axum::Router {
    router(AppStateInner::new(Database::open_in_memory().unwrap()))
}

fn hash() -> String {
    "5f".repeat(32)
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create(app: &axum::Router, message: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/posts",
        Some(json!({
            "category": "Dua Request",
            "message": message,
            "author": "Sincere Servant",
            "anonymous": true,
            "secretHash": hash(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn create_and_list() {
    let app = app();
    let id = create(&app, "  Please pray for my exams  ").await;

    let (status, posts) = send(&app, "GET", "/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["id"], id);
    assert_eq!(posts[0]["message"], "Please pray for my exams");
    assert_eq!(posts[0]["category"], "Dua Request");
    assert_eq!(posts[0]["secretHash"], hash());
}

#[tokio::test]
async fn create_rejects_blank_message_and_bad_hash() {
    let app = app();
    let (status, _) = send(
        &app,
        "POST",
        "/posts",
        Some(json!({
            "category": "Healing",
            "message": "   ",
            "author": "a",
            "secretHash": hash(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/posts",
        Some(json!({
            "category": "Healing",
            "message": "hello",
            "author": "a",
            "secretHash": "plaintext",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reactions_accumulate() {
    let app = app();
    let id = create(&app, "Gratitude for family").await;

    for _ in 0..2 {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/posts/{id}/reactions"),
            Some(json!({ "reaction": "🤲 Ameen" })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (_, posts) = send(&app, "GET", "/posts", None).await;
    assert_eq!(posts[0]["reactions"]["🤲 Ameen"], 2);
}

#[tokio::test]
async fn reaction_on_missing_post_is_not_found() {
    let app = app();
    let (status, _) = send(
        &app,
        "POST",
        &format!("/posts/{}/reactions", uuid::Uuid::new_v4()),
        Some(json!({ "reaction": "✨ SubhanAllah" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn responses_append_and_delete_removes() {
    let app = app();
    let id = create(&app, "Hardship at work").await;

    let (status, resp) = send(
        &app,
        "POST",
        &format!("/posts/{id}/responses"),
        Some(json!({ "author": "Patient Heart", "text": "Stay strong" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resp["text"], "Stay strong");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/posts/{id}/responses"),
        Some(json!({ "author": "Patient Heart", "text": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "DELETE", &format!("/posts/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/posts/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, posts) = send(&app, "GET", "/posts", None).await;
    assert!(posts.as_array().unwrap().is_empty());
}
