#![cfg(feature = "axum")]

mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{CHECKOUT_LINK, CreateReply, FakeProvider};
use http_body_util::BodyExt;
use paywall_core::{
    store::AccessStore,
    types::{ResourceId, SubjectId},
};
use paywall_gate::{gate::AccessGate, routes::router};
use paywall_store::MemoryAccessStore;
use serde_json::{Value, json};
use tower::ServiceExt;

const CONTENT: &str = "intro [paywall_payment price=5]secret text[/paywall_payment]";
const SESSION: &str = "paywall_session=sess-abc";

fn app() -> (Router, FakeProvider, MemoryAccessStore) {
    let provider = FakeProvider::new();
    let store = MemoryAccessStore::new();
    let gate = AccessGate::builder()
        .provider(provider.clone())
        .store(store.clone())
        .build();
    (router(Arc::new(gate)), provider, store)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, SESSION)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookies(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_create_invoice_envelope_and_correlation_cookie() {
    let (app, _, _) = app();

    let response = app
        .oneshot(post(
            "/invoices",
            json!({
                "amount": 5,
                "currency": "SATS",
                "currentPage": "https://blog.example.com/?p=7",
                "postId": "7"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("paywall_initiated_7=") && c.contains("Max-Age=900"))
    );
    assert!(!cookies.iter().any(|c| c.starts_with("paywall_session=")));

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["invoice_url"], CHECKOUT_LINK);
    assert_eq!(body["data"]["invoice_id"], "inv-1");
}

#[tokio::test]
async fn test_create_invoice_rejects_missing_amount() {
    let (app, provider, _) = app();

    let response = app
        .oneshot(post(
            "/invoices",
            json!({
                "currency": "SATS",
                "redirectUrl": "https://blog.example.com/?p=7",
                "resourceId": 7
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["status"], "invalid_request");
    assert!(provider.created().is_empty());
}

#[tokio::test]
async fn test_create_invoice_rejects_malformed_json() {
    let (app, _, _) = app();

    let request = Request::builder()
        .method("POST")
        .uri("/invoices")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["data"]["status"], "invalid_request");
}

#[tokio::test]
async fn test_create_invoice_provider_failure_has_details() {
    let (app, provider, store) = app();
    provider.reply_with(CreateReply::HttpError {
        status: 500,
        body: "upstream exploded".to_string(),
    });

    let response = app
        .oneshot(post(
            "/invoices",
            json!({
                "amount": "5",
                "currency": "SATS",
                "redirectUrl": "https://blog.example.com/?p=7",
                "resourceId": 7
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "invoice_creation_failed");
    assert_eq!(body["data"]["details"], "upstream exploded");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_check_invoice_status() {
    let (app, provider, _) = app();
    provider.set_status("inv-5", "Settled");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/invoices/inv-5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "settled");
    assert_eq!(body["data"]["providerStatus"], "Settled");
    assert_eq!(body["data"]["checkoutUrl"], Value::Null);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/invoices/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["data"]["status"], "not_found");
}

#[tokio::test]
async fn test_grant_then_render_for_same_session() {
    let (app, _, store) = app();

    let response = app
        .clone()
        .oneshot(post("/access", json!({ "post_id": "7", "duration": 24 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["resourceId"], 7);
    assert!(
        store
            .has_valid_access(ResourceId(7), &SubjectId::from("sess-abc"))
            .await
            .unwrap()
    );

    let response = app
        .oneshot(post(
            "/content/render",
            json!({ "resourceId": 7, "content": CONTENT }),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["content"], "intro secret text");
    assert_eq!(body["data"]["state"], "granted");
}

#[tokio::test]
async fn test_grant_rejects_zero_duration() {
    let (app, _, store) = app();

    let response = app
        .oneshot(post("/access", json!({ "resourceId": 7, "duration": 0 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_new_visitor_gets_session_and_locked_content() {
    let (app, _, _) = app();

    let request = Request::builder()
        .method("POST")
        .uri("/content/render")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "resourceId": 7, "content": CONTENT }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let cookies = set_cookies(&response);
    let session = cookies
        .iter()
        .find(|c| c.starts_with("paywall_session="))
        .expect("session cookie issued");
    assert!(session.contains("HttpOnly"));
    assert!(session.contains("SameSite=Lax"));
    assert!(session.contains("Path=/"));

    let body = json_body(response).await;
    assert_eq!(body["data"]["content"], "intro [paywall_payment price=5]");
    assert_eq!(body["data"]["state"], "locked");
}

#[tokio::test]
async fn test_settle_route_grants_on_settlement() {
    let (app, provider, store) = app();
    provider.issue("inv-9", "Paid", Some(json!({ "resourceId": 7 })));

    let response = app
        .oneshot(post(
            "/invoices/inv-9/settle",
            json!({ "resourceId": 7, "duration": 2 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["granted"], true);
    assert_eq!(body["data"]["status"], "settled");
    assert!(body["data"]["expiresAt"].is_string());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_settle_route_refuses_second_redemption() {
    let (app, provider, store) = app();
    provider.issue("inv-9", "Settled", Some(json!({ "resourceId": 7 })));
    let settle = || post("/invoices/inv-9/settle", json!({ "resourceId": 7, "duration": 2 }));

    let response = app.clone().oneshot(settle()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(settle()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["data"]["status"], "already_redeemed");
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_check_invoice_rejects_encoded_traversal() {
    let (app, _, _) = app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/invoices/..%2F..%2F..%2Fusers%2Fme")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "invalid_request");
    assert!(body["data"].get("details").is_none());
}
