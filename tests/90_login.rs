mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{error_of, token_of, TestApp, PASSWORD};
use serde_json::json;
use std::time::{Duration, Instant};

#[tokio::test]
async fn login_success() -> Result<()> {
    let app = TestApp::new()?;
    app.register("John Doe", "john@gmail.com", "publisher").await?;

    let reply = app
        .post("/api/v1/auth/login", None, json!({"email": "john@gmail.com", "password": PASSWORD}))
        .await?;
    assert_eq!(reply.status, StatusCode::OK, "unexpected status: {}", reply.status);
    assert_eq!(reply.body["success"], true);

    let token = token_of(&reply)?;
    assert_eq!(token.split('.').count(), 3, "token is not a JWT: {}", token);
    assert!(reply.cookie.as_deref().is_some_and(|c| c.starts_with("token=")));

    let me = app.get("/api/v1/auth/me", Some(&token)).await?;
    assert_eq!(me.body["data"]["email"], "john@gmail.com");
    Ok(())
}

#[tokio::test]
async fn login_failures_are_indistinguishable() -> Result<()> {
    let app = TestApp::new()?;
    app.register("John Doe", "john@gmail.com", "user").await?;

    let wrong_password = app
        .post("/api/v1/auth/login", None, json!({"email": "john@gmail.com", "password": "nope-nope"}))
        .await?;
    let unknown_email = app
        .post("/api/v1/auth/login", None, json!({"email": "ghost@gmail.com", "password": PASSWORD}))
        .await?;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_email.body);
    assert_eq!(error_of(&wrong_password), "Invalid credentials");
    assert!(wrong_password.cookie.is_none());
    Ok(())
}

#[tokio::test]
async fn unknown_email_costs_as_much_as_wrong_password() -> Result<()> {
    let app = TestApp::new()?;
    app.register("John Doe", "john@gmail.com", "user").await?;

    let mut wrong_password = Duration::ZERO;
    let mut unknown_email = Duration::ZERO;
    for _ in 0..5 {
        let started = Instant::now();
        let reply = app
            .post("/api/v1/auth/login", None, json!({"email": "john@gmail.com", "password": "nope-nope"}))
            .await?;
        wrong_password += started.elapsed();
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

        let started = Instant::now();
        let reply = app
            .post("/api/v1/auth/login", None, json!({"email": "ghost@gmail.com", "password": "nope-nope"}))
            .await?;
        unknown_email += started.elapsed();
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    let ratio = wrong_password.as_secs_f64() / unknown_email.as_secs_f64();
    assert!(
        (1.0 / 3.0..=3.0).contains(&ratio),
        "wrong password {:?} vs unknown email {:?}",
        wrong_password,
        unknown_email
    );
    Ok(())
}

#[tokio::test]
async fn login_requires_both_fields() -> Result<()> {
    let app = TestApp::new()?;

    for body in [json!({}), json!({"email": "john@gmail.com"}), json!({"password": PASSWORD}), json!({"email": "", "password": ""})] {
        let reply = app.post("/api/v1/auth/login", None, body.clone()).await?;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(error_of(&reply), "Please provide an email and password");
    }
    Ok(())
}
