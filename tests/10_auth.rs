mod common;

use anyhow::Result;
use profile_sync::auth::{Claims, JwtVerifier};
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn health_and_banner_are_public() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["status"], "ok");

    let res = client.get(server.url("/")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["name"], "profile-sync");
    Ok(())
}

#[tokio::test]
async fn missing_header_is_unauthorized() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/fetch-user-data")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Missing Authorization header");
    Ok(())
}

#[tokio::test]
async fn non_bearer_scheme_is_unauthorized() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(server.url("/fetch-user-data"))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert!(body["error"].as_str().unwrap_or_default().contains("Bearer"));
    Ok(())
}

#[tokio::test]
async fn rejected_request_never_reaches_the_store() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();

    let res = client
        .put(server.url("/update-user-data"))
        .json(&json!({"firstName": "Mallory"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .put(server.url("/update-user-data"))
        .bearer_auth("not-a-jwt")
        .json(&json!({"firstName": "Mallory"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    assert!(server.store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_forbidden() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(server.url("/fetch-user-data"))
        .bearer_auth("abc.def.ghi")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn token_signed_with_another_secret_is_forbidden() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();

    let foreign = JwtVerifier::new("some-other-secret", None, None)?;
    let token = foreign.issue_token("u1", None, chrono::Duration::hours(1))?;

    let res = client
        .get(server.url("/fetch-user-data"))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn expired_token_is_forbidden() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();

    let token = server.verifier.issue(Claims::new("u1", None, chrono::Duration::hours(-2)))?;

    let res = client
        .get(server.url("/fetch-user-data"))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn valid_token_reaches_the_handler() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();
    let uid = common::unique_uid();

    // No document yet: getting past the filter yields the handler's 404
    let res = client
        .get(server.url("/fetch-user-data"))
        .bearer_auth(server.token_for(&uid, None))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "User not found");
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_not_found() -> Result<()> {
    let server = TestServer::spawn().await?;
    let res = reqwest::Client::new().get(server.url("/nope")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Route not found");
    Ok(())
}
