//! HTTP API driven through the router with forced coin outcomes.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use coinflip::coin::CoinSource;
use coinflip::config::AppConfig;
use coinflip::registry::SessionRegistry;
use coinflip::server::build_router;
use coinflip::server::routes::ServerState;
use coinflip::types::Side;

use crate::mock_coin::MockCoin;

fn app(coin: &MockCoin) -> Router {
    let coin = coin.clone();
    let registry = SessionRegistry::new(&AppConfig::default())
        .with_spin_delay(Duration::ZERO)
        .with_coin_factory(Arc::new(move || -> Box<dyn CoinSource> {
            Box::new(coin.clone())
        }));
    build_router(Arc::new(ServerState::new(registry)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if body.is_some() {
        req = req.header(header::CONTENT_TYPE, "application/json");
    }
    let req = req
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn open(app: &Router, wallet: &str) {
    let (status, snap) = send(app, "POST", &format!("/api/sessions/{wallet}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snap["wallet"], wallet);
}

#[tokio::test]
async fn test_full_bet_over_http() {
    let coin = MockCoin::new();
    let app = app(&coin);
    open(&app, "w1").await;

    let (status, _) = send(&app, "POST", "/api/sessions/w1/stake", Some(r#"{"stake": 0.25}"#)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, snap) = send(&app, "POST", "/api/sessions/w1/side", Some(r#"{"side": "Heads"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snap["phase"], "side_selected");

    coin.force(Side::Heads);
    let (status, flip) = send(&app, "POST", "/api/sessions/w1/flip", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flip["line"], "Heads (0.25): Win +0.25");
    assert_eq!(flip["session"]["balance"].as_f64().unwrap(), 100.25);
    assert_eq!(flip["session"]["win_streak"], 1);
    assert_eq!(flip["session"]["phase"], "idle");

    let (status, history) = send(&app, "GET", "/api/sessions/w1/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["outcome"], "Win");
}

#[tokio::test]
async fn test_side_before_stake_rejected() {
    let coin = MockCoin::new();
    let app = app(&coin);
    open(&app, "w").await;
    let (status, body) = send(&app, "POST", "/api/sessions/w/side", Some(r#"{"side": "tails"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no_stake_selected");
}

#[tokio::test]
async fn test_bad_side_rejected() {
    let coin = MockCoin::new();
    let app = app(&coin);
    open(&app, "w").await;
    send(&app, "POST", "/api/sessions/w/stake", Some(r#"{"stake": 1}"#)).await;
    let (status, body) = send(&app, "POST", "/api/sessions/w/side", Some(r#"{"side": "edge"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_god_mode_over_http() {
    let coin = MockCoin::new();
    let app = app(&coin);
    open(&app, "g").await;

    let (status, snap) = send(&app, "POST", "/api/sessions/g/mode", Some(r#"{"mode": "god"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snap["mode"], "elevated");
    assert_eq!(snap["allowed_stakes"].as_array().unwrap().len(), 2);

    send(&app, "POST", "/api/sessions/g/stake", Some(r#"{"stake": 20}"#)).await;
    send(&app, "POST", "/api/sessions/g/side", Some(r#"{"side": "tails"}"#)).await;
    coin.force(Side::Tails);
    let (status, flip) = send(&app, "POST", "/api/sessions/g/flip", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flip["session"]["balance"].as_f64().unwrap(), 120.0);

    let (_, snap) = send(&app, "POST", "/api/sessions/g/mode/toggle", None).await;
    assert_eq!(snap["mode"], "normal");
}

#[tokio::test]
async fn test_top_up_and_reset() {
    let coin = MockCoin::new();
    let app = app(&coin);
    open(&app, "t").await;

    let (status, snap) = send(&app, "POST", "/api/sessions/t/top-up", Some(r#"{"amount": 5}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snap["balance"].as_f64().unwrap(), 105.0);

    let (status, body) = send(&app, "POST", "/api/sessions/t/top-up", Some(r#"{"amount": -1}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_amount");

    let (status, snap) = send(&app, "POST", "/api/sessions/t/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snap["balance"].as_f64().unwrap(), 100.0);
}

#[tokio::test]
async fn test_wallets_are_isolated() {
    let coin = MockCoin::new();
    let app = app(&coin);
    open(&app, "alice").await;

    send(&app, "POST", "/api/sessions/alice/stake", Some(r#"{"stake": 2}"#)).await;
    send(&app, "POST", "/api/sessions/alice/side", Some(r#"{"side": "heads"}"#)).await;
    coin.force(Side::Tails);
    send(&app, "POST", "/api/sessions/alice/flip", None).await;

    let (status, _) = send(&app, "GET", "/api/sessions/bob", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    open(&app, "bob").await;

    let (_, alice) = send(&app, "GET", "/api/sessions/alice", None).await;
    let (_, bob) = send(&app, "GET", "/api/sessions/bob", None).await;
    assert_eq!(alice["balance"].as_f64().unwrap(), 98.0);
    assert_eq!(alice["loss_streak"], 1);
    assert_eq!(bob["balance"].as_f64().unwrap(), 100.0);
    assert!(bob["history"].as_array().unwrap().is_empty());

    let (status, _) = send(&app, "DELETE", "/api/sessions/alice", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", "/api/sessions/alice/history", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unopened_wallet_is_not_found() {
    let coin = MockCoin::new();
    let app = app(&coin);

    for (method, uri) in [
        ("GET", "/api/sessions/nobody"),
        ("POST", "/api/sessions/nobody/flip"),
        ("POST", "/api/sessions/nobody/mode/toggle"),
        ("POST", "/api/sessions/nobody/reset"),
    ] {
        let (status, body) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(body["error"], "not_found");
    }

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["sessions"], 0);
}
