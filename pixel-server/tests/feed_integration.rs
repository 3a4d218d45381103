//! WebSocket feed integration tests.
//!
//! - Current document on connect, nothing when the canvas is empty
//! - One snapshot per accepted write, to every feed, in commit order
//! - Rejected writes are not broadcast
//! - ping/pong keepalive

mod common;

use std::time::Duration;

use common::{assert_quiet, next_frame, next_snapshot, TestServer};
use futures_util::SinkExt;
use pixel_core::{CanvasDocument, Color, FeedMessage, Grid};
use pixel_server::DocumentHub;
use tokio_tungstenite::tungstenite::Message;

fn document(updated_by: &str, color: &str) -> CanvasDocument {
    CanvasDocument {
        grid: Grid::filled(2, 2, &Color::parse(color).expect("color")),
        last_updated: 0,
        updated_by: updated_by.to_string(),
    }
}

async fn put(server: &TestServer, doc: &CanvasDocument) -> reqwest::StatusCode {
    reqwest::Client::new()
        .put(server.url("/api/canvas"))
        .json(doc)
        .send()
        .await
        .expect("put")
        .status()
}

#[tokio::test]
async fn empty_canvas_sends_nothing_on_connect() {
    let server = TestServer::start().await;
    let mut feed = server.connect_feed().await;
    assert_quiet(&mut feed, Duration::from_millis(200)).await;
    server.shutdown().await;
}

#[tokio::test]
async fn connect_receives_current_document() {
    let server = TestServer::start().await;
    let stored = server
        .hub()
        .publish(document("a@x.com", "#FF0000"))
        .await
        .expect("publish");

    let mut feed = server.connect_feed().await;
    assert_eq!(next_snapshot(&mut feed).await, stored);
    server.shutdown().await;
}

#[tokio::test]
async fn writes_reach_every_feed_in_order() {
    let server = TestServer::start().await;
    let mut first = server.connect_feed().await;
    let mut second = server.connect_feed().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(put(&server, &document("a@x.com", "#FF0000")).await, reqwest::StatusCode::OK);
    assert_eq!(put(&server, &document("b@x.com", "#00FF00")).await, reqwest::StatusCode::OK);

    for feed in [&mut first, &mut second] {
        let a = next_snapshot(feed).await;
        let b = next_snapshot(feed).await;
        assert_eq!(a.updated_by, "a@x.com");
        assert_eq!(b.updated_by, "b@x.com");
        assert!(a.last_updated < b.last_updated);
    }
    server.shutdown().await;
}

#[tokio::test]
async fn writer_also_receives_its_own_write() {
    let server = TestServer::start().await;
    let mut feed = server.connect_feed().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    put(&server, &document("a@x.com", "#FF0000")).await;
    assert!(next_snapshot(&mut feed).await.is_from("a@x.com"));
    server.shutdown().await;
}

#[tokio::test]
async fn rejected_write_is_not_broadcast() {
    let server = TestServer::start_with(DocumentHub::new().with_dimensions(2, 2)).await;
    let mut feed = server.connect_feed().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let wrong = CanvasDocument {
        grid: Grid::filled(3, 3, &Color::background()),
        last_updated: 0,
        updated_by: "a@x.com".to_string(),
    };
    assert_eq!(
        put(&server, &wrong).await,
        reqwest::StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_quiet(&mut feed, Duration::from_millis(200)).await;
    server.shutdown().await;
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    let server = TestServer::start().await;
    let mut feed = server.connect_feed().await;

    feed.send(Message::Text(r#"{"type":"ping"}"#.into()))
        .await
        .expect("send");
    assert_eq!(next_frame(&mut feed).await, FeedMessage::Pong);

    feed.send(Message::Text("not json".into())).await.expect("send");
    assert!(matches!(next_frame(&mut feed).await, FeedMessage::Error { .. }));
    server.shutdown().await;
}

#[tokio::test]
async fn closed_feed_is_released() {
    let server = TestServer::start().await;
    let mut feed = server.connect_feed().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.hub().subscriber_count(), 1);

    feed.close(None).await.expect("close");
    drop(feed);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.hub().subscriber_count(), 0);
    server.shutdown().await;
}
