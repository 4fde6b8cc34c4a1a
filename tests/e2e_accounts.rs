//! E2E tests for account registration, login, and the profile icon

mod common;

use common::TestServer;
use serde_json::Value;

#[tokio::test]
async fn signup_returns_a_working_token() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/accounts/signup"))
        .json(&serde_json::json!({
            "username": "rin",
            "password": "password123",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    let token = json["token"].as_str().unwrap().to_string();
    assert_eq!(json["user"]["username"], "rin");
    assert_eq!(json["user"]["icon"], "");
    assert_eq!(json["user"]["is_superuser"], false);

    let profile = server
        .client
        .get(server.url("/accounts/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(profile.status(), 200);
    let profile: Value = profile.json().await.unwrap();
    assert_eq!(profile["username"], "rin");
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let server = TestServer::new().await;
    server.create_user("rin", false).await;

    let response = server
        .client
        .post(server.url("/accounts/signup"))
        .json(&serde_json::json!({
            "username": "rin",
            "password": "password123",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn short_password_is_rejected() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/accounts/signup"))
        .json(&serde_json::json!({
            "username": "rin",
            "password": "short",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn login_checks_the_password() {
    let server = TestServer::new().await;
    server.create_user("rin", false).await;

    let wrong = server
        .client
        .post(server.url("/accounts/login"))
        .json(&serde_json::json!({
            "username": "rin",
            "password": "not-the-password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);

    let right = server
        .client
        .post(server.url("/accounts/login"))
        .json(&serde_json::json!({
            "username": "rin",
            "password": "password123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(right.status(), 200);

    let json: Value = right.json().await.unwrap();
    assert!(json["token"].as_str().is_some());
}

#[tokio::test]
async fn unknown_user_cannot_log_in() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/accounts/login"))
        .json(&serde_json::json!({
            "username": "ghost",
            "password": "password123",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn profile_requires_auth() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/accounts/profile"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn profile_icon_can_be_updated_and_cleared() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("rin", false).await;

    let updated = server
        .client
        .patch(server.url("/accounts/profile"))
        .bearer_auth(&token)
        .json(&serde_json::json!({"icon": "/media/users/rin/icon.png"}))
        .send()
        .await
        .unwrap();

    assert_eq!(updated.status(), 200);
    let json: Value = updated.json().await.unwrap();
    assert_eq!(json["icon"], "/media/users/rin/icon.png");

    let cleared = server
        .client
        .patch(server.url("/accounts/profile"))
        .bearer_auth(&token)
        .json(&serde_json::json!({"icon": null}))
        .send()
        .await
        .unwrap();

    assert_eq!(cleared.status(), 200);
    let json: Value = cleared.json().await.unwrap();
    assert_eq!(json["icon"], "");
}
