//! E2E tests for signed push ingestion
//!
//! A remote publisher POSTs Atom payloads at a feed URL with an
//! X-Hub-Signature header. These tests drive the full HTTP path:
//! signature gate, parse, idempotent merge, and the counts reported back.

mod common;

use chrono::{TimeZone, Utc};
use common::TestServer;
use tidepool::federation::atom::{Entry, FeedDocument};
use tidepool::federation::{atom, sign};

fn payload_with_two_entries() -> String {
    let t1 = Utc.with_ymd_and_hms(2011, 3, 14, 15, 9, 26).unwrap();
    let t2 = Utc.with_ymd_and_hms(2011, 3, 15, 8, 0, 0).unwrap();
    atom::render(&FeedDocument {
        url: "https://remote.example/feeds/7.atom".to_string(),
        title: "dave".to_string(),
        updated: t2,
        hubs: vec![],
        entries: vec![
            Entry {
                entry_id: "tag:remote.example,2011:update-2".to_string(),
                author_name: "dave".to_string(),
                text: "second post".to_string(),
                published_at: t2,
            },
            Entry {
                entry_id: "tag:remote.example,2011:update-1".to_string(),
                author_name: "dave".to_string(),
                text: "first post".to_string(),
                published_at: t1,
            },
        ],
    })
}

async fn feed_secret(server: &TestServer, feed_id: &str) -> String {
    server
        .state
        .db
        .get_feed(feed_id)
        .await
        .unwrap()
        .unwrap()
        .hub_secret
}

#[tokio::test]
async fn signed_payload_is_ingested_then_deduplicated() {
    let server = TestServer::new().await;
    let (feed_id, _) = server.create_test_author("carol").await;
    let secret = feed_secret(&server, &feed_id).await;

    let body = payload_with_two_entries();
    let signature = sign(body.as_bytes(), &secret);

    // First delivery: both entries are new.
    let response = server
        .client
        .post(server.url(&format!("/feeds/{}.atom", feed_id)))
        .header("X-Hub-Signature", &signature)
        .body(body.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["accepted"], 2);
    assert_eq!(json["skipped"], 0);

    // Second delivery of the same payload: at-least-once upstream, nothing
    // new here.
    let response = server
        .client
        .post(server.url(&format!("/feeds/{}.atom", feed_id)))
        .header("X-Hub-Signature", &signature)
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["accepted"], 0);
    assert_eq!(json["skipped"], 2);

    assert_eq!(
        server.state.db.get_updates(&feed_id).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn ingested_entries_show_up_in_the_rendered_feed() {
    let server = TestServer::new().await;
    let (feed_id, _) = server.create_test_author("carol").await;
    let secret = feed_secret(&server, &feed_id).await;

    let body = payload_with_two_entries();
    let signature = sign(body.as_bytes(), &secret);

    server
        .client
        .post(server.url(&format!("/feeds/{}.atom", feed_id)))
        .header("X-Hub-Signature", &signature)
        .body(body)
        .send()
        .await
        .unwrap();

    let rendered = server
        .client
        .get(server.url(&format!("/feeds/{}.atom", feed_id)))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let entries = atom::parse(rendered.as_bytes()).unwrap();
    assert_eq!(entries.len(), 2);
    // Reverse-chronological: the later entry renders first.
    assert_eq!(entries[0].text, "second post");
    assert_eq!(entries[1].text, "first post");
}

#[tokio::test]
async fn tampered_body_is_rejected_with_401_and_nothing_applied() {
    let server = TestServer::new().await;
    let (feed_id, _) = server.create_test_author("carol").await;
    let secret = feed_secret(&server, &feed_id).await;

    let body = payload_with_two_entries();
    let signature = sign(body.as_bytes(), &secret);
    let tampered = body.replace("first post", "forged post");

    let response = server
        .client
        .post(server.url(&format!("/feeds/{}.atom", feed_id)))
        .header("X-Hub-Signature", &signature)
        .body(tampered)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    assert!(server.state.db.get_updates(&feed_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_signature_is_rejected_with_401() {
    let server = TestServer::new().await;
    let (feed_id, _) = server.create_test_author("carol").await;

    let response = server
        .client
        .post(server.url(&format!("/feeds/{}.atom", feed_id)))
        .body(payload_with_two_entries())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn malformed_payload_is_rejected_with_400() {
    let server = TestServer::new().await;
    let (feed_id, _) = server.create_test_author("carol").await;
    let secret = feed_secret(&server, &feed_id).await;

    let body = "<feed><entry><id>tag:1</id>";
    let signature = sign(body.as_bytes(), &secret);

    let response = server
        .client
        .post(server.url(&format!("/feeds/{}.atom", feed_id)))
        .header("X-Hub-Signature", &signature)
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert!(server.state.db.get_updates(&feed_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn push_to_unknown_feed_returns_404() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/feeds/01UNKNOWNFEEDID0000000000.atom"))
        .header("X-Hub-Signature", "sha1=0000")
        .body(payload_with_two_entries())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn concurrent_duplicate_deliveries_create_each_entry_once() {
    let server = TestServer::new().await;
    let (feed_id, _) = server.create_test_author("carol").await;
    let secret = feed_secret(&server, &feed_id).await;

    let body = payload_with_two_entries();
    let signature = sign(body.as_bytes(), &secret);

    // Several publishers deliver the same payload at once; the per-feed
    // lock serializes the merges.
    let mut handles = Vec::new();
    for _ in 0..4 {
        let client = server.client.clone();
        let url = server.url(&format!("/feeds/{}.atom", feed_id));
        let body = body.clone();
        let signature = signature.clone();
        handles.push(tokio::spawn(async move {
            client
                .post(&url)
                .header("X-Hub-Signature", &signature)
                .body(body)
                .send()
                .await
                .unwrap()
                .status()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }

    assert_eq!(
        server.state.db.get_updates(&feed_id).await.unwrap().len(),
        2
    );
}
