mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::http::{app, get, post};
use serde_json::json;
use tower::ServiceExt;

async fn seed(app: &Router) {
    for nick in ["alice", "bob"] {
        let (status, _) = post(
            app,
            &format!("/api/user/{nick}/create"),
            json!({ "fullname": nick.to_uppercase(), "about": "", "email": format!("{nick}@sea.org") }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = post(app, "/api/forum/create", json!({ "slug": "pirates", "title": "Pirates", "user": "ALICE" })).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn user_lifecycle() {
    let app = app();
    let (status, body) = post(&app, "/api/user/alice/create", json!({ "fullname": "Alice", "about": "", "email": "a@sea.org" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["nickname"], "alice");

    let (status, body) = post(&app, "/api/user/ALICE/create", json!({ "fullname": "Imposter", "about": "", "email": "x@sea.org" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["fullname"], "Alice");

    let (status, body) = post(&app, "/api/user/Alice/profile", json!({ "about": "captain" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["about"], "captain");
    assert_eq!(body["email"], "a@sea.org");

    let (status, body) = get(&app, "/api/user/nobody/profile").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn forum_creation_and_conflict() {
    let app = app();
    seed(&app).await;

    let (status, body) = get(&app, "/api/forum/PIRATES/details").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "alice");
    assert_eq!(body["threads"], 0);

    let (status, body) = post(&app, "/api/forum/create", json!({ "slug": "Pirates", "title": "Other", "user": "bob" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["title"], "Pirates");

    let (status, _) = post(&app, "/api/forum/create", json!({ "slug": "ghosts", "title": "Ghosts", "user": "nobody" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn thread_create_update_and_vote() {
    let app = app();
    seed(&app).await;

    let (status, thread) = post(
        &app,
        "/api/forum/pirates/create",
        json!({ "slug": "voyage", "title": "Voyage", "author": "bob", "message": "Where to?" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(thread["forum"], "pirates");
    let id = thread["id"].as_i64().unwrap();

    let (status, again) = post(
        &app,
        "/api/forum/pirates/create",
        json!({ "slug": "VOYAGE", "title": "Dup", "author": "alice", "message": "..." }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["id"], id);

    let (status, updated) = post(&app, &format!("/api/thread/{id}/details"), json!({ "title": "Long voyage" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Long voyage");
    assert_eq!(updated["message"], "Where to?");

    let (_, voted) = post(&app, "/api/thread/voyage/vote", json!({ "nickname": "alice", "voice": 1 })).await;
    assert_eq!(voted["votes"], 1);
    let (_, voted) = post(&app, "/api/thread/voyage/vote", json!({ "nickname": "alice", "voice": -1 })).await;
    assert_eq!(voted["votes"], -1);

    let (status, _) = post(&app, "/api/thread/voyage/vote", json!({ "nickname": "ghost", "voice": 1 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = post(&app, "/api/thread/voyage/vote", json!({ "nickname": "alice", "voice": 5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forum_listings() {
    let app = app();
    seed(&app).await;
    for (slug, created) in [("a", "2024-01-01T00:00:00Z"), ("b", "2024-01-02T00:00:00Z")] {
        post(
            &app,
            "/api/forum/pirates/create",
            json!({ "slug": slug, "title": slug, "author": "bob", "message": "m", "created": created }),
        )
        .await;
    }

    let (status, threads) = get(&app, "/api/forum/pirates/threads?desc=true&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(threads[0]["slug"], "b");

    let (_, threads) = get(&app, "/api/forum/pirates/threads?since=2024-01-02T00:00:00Z").await;
    assert_eq!(threads.as_array().map(Vec::len), Some(1));

    let (status, _) = get(&app, "/api/forum/pirates/threads?since=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, users) = get(&app, "/api/forum/pirates/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users[0]["nickname"], "bob");
    assert_eq!(users.as_array().map(Vec::len), Some(1));

    let (status, _) = get(&app, "/api/forum/nowhere/users").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_and_clear() {
    let app = app();
    seed(&app).await;

    let (status, counts) = get(&app, "/api/service/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(counts, json!({ "user": 2, "forum": 1, "thread": 0, "post": 0 }));

    let (status, _) = post(&app, "/api/service/clear", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, counts) = get(&app, "/api/service/status").await;
    assert_eq!(counts, json!({ "user": 0, "forum": 0, "thread": 0, "post": 0 }));
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = app();
    let response = app
        .oneshot(Request::get("/api/service/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}
