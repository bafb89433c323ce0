mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chatbridge_core::session::LifecycleEvent;
use chatbridge_manager::{build_router, AppState, SessionRegistry};
use common::{credential, harness};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app_state(registry: Arc<SessionRegistry>) -> AppState {
    AppState {
        registry,
        base_url: "http://gateway.test".to_string(),
        qr_wait: Duration::from_millis(200),
    }
}

async fn get(state: AppState, uri: &str) -> (StatusCode, String) {
    let response = build_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let h = harness(&["bot1"], vec![]);
    let state = app_state(h.registry.clone());

    for uri in ["/bot9", "/bot9/qr", "/bot9/status"] {
        let (status, body) = get(state.clone(), uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body, "Unknown session: bot9");
    }
    assert_eq!(h.factory.creates(), 0);
}

#[tokio::test]
async fn test_qr_page_shows_credential() {
    let h = harness(&["bot1"], vec![vec![credential("2@abc")]]);

    let (status, body) = get(app_state(h.registry.clone()), "/bot1/qr").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("http://qr.test/render?size=300x300"));
    assert!(body.contains("data=2%40abc"));
    assert!(body.contains("Issued at"));
    assert_eq!(h.factory.creates(), 1);
}

#[tokio::test]
async fn test_name_alias_serves_qr_page() {
    let h = harness(&["bot1"], vec![vec![credential("2@abc")]]);

    let (status, body) = get(app_state(h.registry.clone()), "/bot1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("data=2%40abc"));
}

#[tokio::test]
async fn test_qr_page_times_out_as_not_available() {
    let h = harness(&["bot1"], vec![]);

    let (status, body) = get(app_state(h.registry.clone()), "/bot1/qr").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("not available"));
    assert!(body.contains("try again"));
}

#[tokio::test]
async fn test_authenticated_session_skips_qr() {
    let h = harness(
        &["bot1"],
        vec![vec![LifecycleEvent::Authenticated, LifecycleEvent::Ready]],
    );
    let state = app_state(h.registry.clone());

    let (status, body) = get(state.clone(), "/bot1/qr").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("already authenticated"));

    let bot = h.registry.peek("bot1").unwrap();
    common::eventually(|| bot.is_ready()).await;
    let (_, body) = get(state, "/bot1/qr").await;
    assert!(body.contains("already authenticated"));
    assert_eq!(h.factory.creates(), 1);
}

#[tokio::test]
async fn test_status_reports_snapshot() {
    let h = harness(&["bot1"], vec![vec![credential("2@abc")]]);
    let state = app_state(h.registry.clone());

    let (status, body) = get(state.clone(), "/bot1/status").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["name"], "bot1");
    assert_eq!(json["state"], "uninitialized");
    assert_eq!(json["ready"], false);
    assert_eq!(json["reconnect_attempts"], 0);
    assert!(json.get("pairing_credential").is_none());
    assert_eq!(h.factory.creates(), 0);

    let bot = h.registry.get("bot1").await.unwrap();
    common::eventually(|| bot.status().has_credential).await;
    let (_, body) = get(state, "/bot1/status").await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["state"], "awaiting_scan");
    assert!(json["pairing_issued_at"].is_string());
}

#[tokio::test]
async fn test_index_links_sessions() {
    let h = harness(&["bot1", "bot2"], vec![]);

    let (status, body) = get(app_state(h.registry.clone()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("http://gateway.test/bot1/status"));
    assert!(body.contains("http://gateway.test/bot1/qr"));
    assert!(body.contains("http://gateway.test/bot2/qr"));
}

#[tokio::test]
async fn test_sessions_lists_all_configured() {
    let h = harness(&["bot1", "bot2"], vec![]);

    let (status, body) = get(app_state(h.registry.clone()), "/api/sessions").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let sessions = json.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["name"], "bot1");
    assert_eq!(sessions[1]["name"], "bot2");
    assert!(sessions.iter().all(|s| s["state"] == "uninitialized"));
}
