//! E2E tests for the help chat
//!
//! Covers the conversation guard, the lazy get-or-create entry point, the
//! staff/owner recipient convention, and the long-poll chat feed.

mod common;

use common::TestServer;
use serde_json::Value;
use std::time::{Duration, Instant};

fn feed_request(
    server: &TestServer,
    conversation_id: &str,
    token: &str,
    after: Option<&str>,
) -> reqwest::RequestBuilder {
    let mut query = vec![("message", "1")];
    if let Some(after) = after {
        query.push(("after", after));
    }

    server
        .client
        .get(server.url(&format!("/help-chat/{}", conversation_id)))
        .header("X-Requested-With", "XMLHttpRequest")
        .query(&query)
        .bearer_auth(token)
}

#[tokio::test]
async fn entry_creates_conversation_and_redirects() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("rin", false).await;

    let first = server
        .client
        .get(server.url("/help-chat"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(first.status(), 303);
    let location = first.headers()["location"].to_str().unwrap().to_string();
    assert!(location.starts_with("/help-chat/"));

    // A second visit lands on the same conversation.
    let second = server
        .client
        .get(server.url("/help-chat"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(
        second.headers()["location"].to_str().unwrap(),
        location.as_str()
    );
}

#[tokio::test]
async fn concurrent_entry_resolves_to_single_conversation() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("rin", false).await;

    let request = || {
        server
            .client
            .get(server.url("/help-chat"))
            .bearer_auth(&token)
            .send()
    };
    let (a, b) = tokio::join!(request(), request());
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a.status(), 303);
    assert_eq!(b.status(), 303);
    assert_eq!(
        a.headers()["location"].to_str().unwrap(),
        b.headers()["location"].to_str().unwrap()
    );
}

#[tokio::test]
async fn staff_entry_lists_all_conversations() {
    let server = TestServer::new().await;
    let (owner, _) = server.create_user("rin", false).await;
    let (_, staff_token) = server.create_user("support", true).await;
    let (conversation, _) = server
        .state
        .db
        .get_or_create_conversation(&owner.id)
        .await
        .unwrap();

    let response = server
        .client
        .get(server.url("/help-chat"))
        .bearer_auth(&staff_token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    let rows = json.as_array().unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], conversation.id.as_str());
    assert_eq!(rows[0]["username"], "rin");
}

#[tokio::test]
async fn not_found_and_forbidden_are_distinct() {
    let server = TestServer::new().await;
    let (owner, _) = server.create_user("rin", false).await;
    let (_, intruder_token) = server.create_user("mallory", false).await;
    let (conversation, _) = server
        .state
        .db
        .get_or_create_conversation(&owner.id)
        .await
        .unwrap();

    // Unknown id: 404 before any polling starts.
    let missing = feed_request(&server, "does-not-exist", &intruder_token, None)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    // Someone else's conversation: 403, also before any polling.
    let forbidden = feed_request(&server, &conversation.id, &intruder_token, None)
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);
}

#[tokio::test]
async fn is_user_flag_follows_the_viewer() {
    let server = TestServer::new().await;
    let (owner, owner_token) = server.create_user("rin", false).await;
    let (staff, staff_token) = server.create_user("support", true).await;
    let (conversation, _) = server
        .state
        .db
        .get_or_create_conversation(&owner.id)
        .await
        .unwrap();

    server
        .seed_message(&conversation.id, &owner, None, "necesito ayuda", 1_000_000)
        .await;
    server
        .seed_message(&conversation.id, &staff, Some(&owner), "dime", 2_000_000)
        .await;

    let as_owner = feed_request(&server, &conversation.id, &owner_token, None)
        .send()
        .await
        .unwrap();
    let json: Value = as_owner.json().await.unwrap();
    let events = json.as_array().unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["sender"], "rin");
    assert_eq!(events[0]["is_user"], true);
    assert_eq!(events[1]["sender"], "support");
    assert_eq!(events[1]["is_user"], false);

    // Same thread viewed by staff: the flags flip.
    let as_staff = feed_request(&server, &conversation.id, &staff_token, None)
        .send()
        .await
        .unwrap();
    let json: Value = as_staff.json().await.unwrap();
    let events = json.as_array().unwrap();

    assert_eq!(events[0]["is_user"], false);
    assert_eq!(events[1]["is_user"], true);
}

#[tokio::test]
async fn sender_icon_defaults_to_empty_string() {
    let server = TestServer::new().await;
    let (owner, token) = server.create_user("rin", false).await;
    let (conversation, _) = server
        .state
        .db
        .get_or_create_conversation(&owner.id)
        .await
        .unwrap();
    server
        .seed_message(&conversation.id, &owner, None, "hola", 1_000_000)
        .await;

    let response = feed_request(&server, &conversation.id, &token, None)
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json.as_array().unwrap()[0]["icon"], "");

    // Once the sender sets an icon, projection picks it up (the join reads
    // the sender's current profile, not a snapshot).
    server
        .state
        .db
        .update_user_icon(&owner.id, Some("/media/users/rin/icon.png"))
        .await
        .unwrap();

    let response = feed_request(&server, &conversation.id, &token, None)
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(
        json.as_array().unwrap()[0]["icon"],
        "/media/users/rin/icon.png"
    );
}

#[tokio::test]
async fn message_recipient_follows_the_staff_convention() {
    let server = TestServer::new().await;
    let (owner, owner_token) = server.create_user("rin", false).await;
    let (_, staff_token) = server.create_user("support", true).await;
    let (conversation, _) = server
        .state
        .db
        .get_or_create_conversation(&owner.id)
        .await
        .unwrap();

    // Owner message: no recipient.
    let response = server
        .client
        .post(server.url(&format!("/help-chat/{}", conversation.id)))
        .bearer_auth(&owner_token)
        .form(&[("message", "necesito ayuda")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);

    let last = server
        .state
        .db
        .last_message(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.sender_id, owner.id);
    assert_eq!(last.recipient_id, None);

    // Staff message: addressed to the conversation owner.
    let response = server
        .client
        .post(server.url(&format!("/help-chat/{}", conversation.id)))
        .bearer_auth(&staff_token)
        .form(&[("message", "dime")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);

    let last = server
        .state
        .db
        .last_message(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.recipient_id, Some(owner.id.clone()));
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let server = TestServer::new().await;
    let (owner, token) = server.create_user("rin", false).await;
    let (conversation, _) = server
        .state
        .db
        .get_or_create_conversation(&owner.id)
        .await
        .unwrap();

    let response = server
        .client
        .post(server.url(&format!("/help-chat/{}", conversation.id)))
        .bearer_auth(&token)
        .form(&[("message", "   ")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn message_arriving_mid_poll_is_delivered() {
    let server = TestServer::new().await;
    let (owner, owner_token) = server.create_user("rin", false).await;
    let (staff, _) = server.create_user("support", true).await;
    let (conversation, _) = server
        .state
        .db
        .get_or_create_conversation(&owner.id)
        .await
        .unwrap();

    let cursor = format!("{:.6}", chrono::Utc::now().timestamp_micros() as f64 / 1e6);

    let db = server.state.db.clone();
    let pending = {
        let conversation_id = conversation.id.clone();
        let staff = staff.clone();
        let owner_id = owner.id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            db.insert_message(&takosu::data::HelpMessage {
                id: takosu::data::EntityId::new().0,
                conversation_id,
                sender_id: staff.id.clone(),
                recipient_id: Some(owner_id),
                message: "ya estoy aquí".to_string(),
                created_at: takosu::data::now_micros(),
            })
            .await
            .unwrap();
        })
    };

    let started = Instant::now();
    let response = feed_request(&server, &conversation.id, &owner_token, Some(&cursor))
        .send()
        .await
        .unwrap();
    pending.await.unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    let events = json.as_array().unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["message"], "ya estoy aquí");
    assert_eq!(events[0]["is_user"], false);
    assert!(started.elapsed() < Duration::from_millis(1_200));
}

#[tokio::test]
async fn chat_cursor_boundary_is_exclusive() {
    let server = TestServer::new().await;
    let (owner, token) = server.create_user("rin", false).await;
    let (conversation, _) = server
        .state
        .db
        .get_or_create_conversation(&owner.id)
        .await
        .unwrap();
    server
        .seed_message(&conversation.id, &owner, None, "hola", 200_000_000)
        .await;

    // Cursor equals the only message's timestamp: the poll must time out
    // empty rather than redeliver it.
    let response = feed_request(&server, &conversation.id, &token, Some("200"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn non_xhr_request_returns_conversation_page() {
    let server = TestServer::new().await;
    let (owner, token) = server.create_user("rin", false).await;
    let (conversation, _) = server
        .state
        .db
        .get_or_create_conversation(&owner.id)
        .await
        .unwrap();
    server
        .seed_message(&conversation.id, &owner, None, "hola", 1_000_000)
        .await;

    let response = server
        .client
        .get(server.url(&format!("/help-chat/{}", conversation.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();

    assert_eq!(json["id"], conversation.id.as_str());
    assert_eq!(json["messages"].as_array().unwrap().len(), 1);
}
