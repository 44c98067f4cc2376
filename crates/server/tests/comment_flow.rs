//! Integration tests for the comment flow:
//! persist via the content store, announce via the realtime hub, and gate
//! mutating endpoints behind bearer auth.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use blog_server::blog::BlogStatus;
use blog_server::comment::create_comment;
use blog_server::core::auth::UserInfo;
use blog_server::core::{AppState, ServerConfig};
use blog_server::realtime::{ConnectionId, ServerMessage};
use blog_server::{build_router, build_state};
use tempfile::TempDir;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tower::ServiceExt;
use uuid::Uuid;

async fn test_state(dir: &TempDir) -> AppState {
    let config = ServerConfig::with_base_dir(dir.path());
    build_state(config).await.unwrap()
}

async fn register(state: &AppState, name: &str, email: &str) -> UserInfo {
    state
        .users
        .create(name.into(), email.into(), "password123".into(), None)
        .await
        .unwrap()
        .into()
}

fn subscribe(state: &AppState, blog_id: &str) -> (ConnectionId, UnboundedReceiver<ServerMessage>) {
    let conn_id = Uuid::new_v4();
    let (tx, rx) = unbounded_channel();
    state.hub.connect(conn_id, tx);
    state.hub.join(conn_id, blog_id);
    (conn_id, rx)
}

fn next_event(rx: &mut UnboundedReceiver<ServerMessage>) -> Option<ServerMessage> {
    rx.try_recv().ok()
}

#[tokio::test]
async fn comment_creation_broadcasts_to_subscribers() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;

    let alice = register(&state, "Alice", "alice@test.com").await;
    let bob = register(&state, "Bob", "bob@test.com").await;

    let blog = state
        .blogs
        .create(
            &alice,
            "First post".into(),
            "Body".into(),
            None,
            BlogStatus::Published,
        )
        .await
        .unwrap();

    let (_c1, mut rx1) = subscribe(&state, &blog.id);
    let (_c2, mut rx2) = subscribe(&state, &blog.id);

    let comment = create_comment(&state, &bob, &blog.id, "hello", None)
        .await
        .unwrap();
    assert_eq!(comment.text, "hello");
    assert_eq!(comment.author_name, "Bob");

    // Exactly one event per subscriber, carrying the persisted comment
    for rx in [&mut rx1, &mut rx2] {
        let Some(ServerMessage::UpdateComments(event)) = next_event(rx) else {
            panic!("subscriber did not receive the comment event");
        };
        assert_eq!(event.blog_id, blog.id);
        assert_eq!(event.text, "hello");
        assert_eq!(event.author_name, "Bob");
        assert_eq!(event.comment_id, comment.id);
        assert!(next_event(rx).is_none(), "event must arrive exactly once");
    }

    // And the comment is persisted
    let comments = state.comments.list_for_blog(&blog.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "hello");
}

#[tokio::test]
async fn comment_posted_over_http_reaches_subscribers() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;
    let app = build_router(state.clone());

    let alice = register(&state, "Alice", "alice@test.com").await;
    let blog = state
        .blogs
        .create(
            &alice,
            "Post".into(),
            "Body".into(),
            None,
            BlogStatus::Published,
        )
        .await
        .unwrap();

    let (_conn, mut rx) = subscribe(&state, &blog.id);

    let token = state.tokens.issue(&alice.id).unwrap();
    let body = serde_json::json!({ "blog_id": blog.id, "text": "hello" });
    let request = Request::builder()
        .method("POST")
        .uri("/comments")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let Some(ServerMessage::UpdateComments(event)) = next_event(&mut rx) else {
        panic!("subscriber did not receive the comment event");
    };
    assert_eq!(event.blog_id, blog.id);
    assert_eq!(event.text, "hello");
    assert!(next_event(&mut rx).is_none());
}

#[tokio::test]
async fn failed_comment_write_produces_no_broadcast() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;

    let bob = register(&state, "Bob", "bob@test.com").await;

    // Subscribed to a room whose blog does not exist
    let (_conn, mut rx) = subscribe(&state, "no-such-blog");

    let result = create_comment(&state, &bob, "no-such-blog", "hello", None).await;
    assert!(result.is_err(), "commenting on a missing blog must fail");

    assert!(
        next_event(&mut rx).is_none(),
        "a failed write must suppress the broadcast"
    );
    assert!(state
        .comments
        .list_for_blog("no-such-blog")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn empty_comment_text_is_rejected_before_the_store() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;

    let alice = register(&state, "Alice", "alice@test.com").await;
    let blog = state
        .blogs
        .create(
            &alice,
            "Post".into(),
            "Body".into(),
            None,
            BlogStatus::Published,
        )
        .await
        .unwrap();

    let (_conn, mut rx) = subscribe(&state, &blog.id);

    assert!(create_comment(&state, &alice, &blog.id, "   ", None)
        .await
        .is_err());
    assert!(next_event(&mut rx).is_none());
}

#[tokio::test]
async fn disconnected_subscriber_receives_nothing_for_any_room() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;

    let alice = register(&state, "Alice", "alice@test.com").await;

    let blog1 = state
        .blogs
        .create(
            &alice,
            "One".into(),
            "Body".into(),
            None,
            BlogStatus::Published,
        )
        .await
        .unwrap();
    let blog2 = state
        .blogs
        .create(
            &alice,
            "Two".into(),
            "Body".into(),
            None,
            BlogStatus::Published,
        )
        .await
        .unwrap();

    let (gone, mut rx_gone) = subscribe(&state, &blog1.id);
    state.hub.join(gone, &blog2.id);

    // Second subscriber keeps both rooms alive
    let (stays, mut rx_stays) = subscribe(&state, &blog1.id);
    state.hub.join(stays, &blog2.id);

    state.hub.leave(gone);

    create_comment(&state, &alice, &blog1.id, "to room one", None)
        .await
        .unwrap();
    create_comment(&state, &alice, &blog2.id, "to room two", None)
        .await
        .unwrap();

    assert!(next_event(&mut rx_gone).is_none());

    let Some(ServerMessage::UpdateComments(first)) = next_event(&mut rx_stays) else {
        panic!("remaining subscriber lost room one");
    };
    let Some(ServerMessage::UpdateComments(second)) = next_event(&mut rx_stays) else {
        panic!("remaining subscriber lost room two");
    };
    assert_eq!(first.text, "to room one");
    assert_eq!(second.text, "to room two");
}

#[tokio::test]
async fn comments_in_one_room_are_delivered_in_publish_order() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;

    let alice = register(&state, "Alice", "alice@test.com").await;
    let blog = state
        .blogs
        .create(
            &alice,
            "Post".into(),
            "Body".into(),
            None,
            BlogStatus::Published,
        )
        .await
        .unwrap();

    let (_conn, mut rx) = subscribe(&state, &blog.id);

    create_comment(&state, &alice, &blog.id, "first", None)
        .await
        .unwrap();
    create_comment(&state, &alice, &blog.id, "second", None)
        .await
        .unwrap();

    let texts: Vec<String> = std::iter::from_fn(|| match next_event(&mut rx) {
        Some(ServerMessage::UpdateComments(e)) => Some(e.text),
        None => None,
    })
    .collect();
    assert_eq!(texts, ["first", "second"]);
}

#[tokio::test]
async fn auth_gate_accepts_live_accounts_and_rejects_everything_else() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;
    let app = build_router(state.clone());

    let alice = register(&state, "Alice", "alice@test.com").await;
    let good_token = state.tokens.issue(&alice.id).unwrap();
    // Verifies fine, but the account it names does not exist
    let ghost_token = state.tokens.issue(&Uuid::new_v4().to_string()).unwrap();

    let me = |token: Option<String>| {
        let mut builder = Request::builder().uri("/auth/me");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    };

    let ok = app.clone().oneshot(me(Some(good_token))).await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let ghost = app.clone().oneshot(me(Some(ghost_token))).await.unwrap();
    assert_eq!(ghost.status(), StatusCode::UNAUTHORIZED);

    let garbage = app
        .clone()
        .oneshot(me(Some("not-a-token".into())))
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    let missing = app.clone().oneshot(me(None)).await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_the_owner_may_mutate_a_blog() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;
    let app = build_router(state.clone());

    let alice = register(&state, "Alice", "alice@test.com").await;
    let bob = register(&state, "Bob", "bob@test.com").await;

    let blog = state
        .blogs
        .create(
            &alice,
            "Alice's post".into(),
            "Body".into(),
            None,
            BlogStatus::Published,
        )
        .await
        .unwrap();

    let bob_token = state.tokens.issue(&bob.id).unwrap();
    let update = Request::builder()
        .method("PUT")
        .uri(format!("/blogs/{}", blog.id))
        .header(header::AUTHORIZATION, format!("Bearer {}", bob_token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"title":"Bob's now"}"#))
        .unwrap();

    let response = app.clone().oneshot(update).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Unchanged
    let unchanged = state.blogs.get(&blog.id).await.unwrap().unwrap();
    assert_eq!(unchanged.title, "Alice's post");
}
