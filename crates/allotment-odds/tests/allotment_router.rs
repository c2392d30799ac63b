//! HTTP behavior of the allotment router, exercised through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use allotment_odds::allotment::{
    allotment_router, AllotmentCalculator, AllotmentState, ProbabilityEngine, INPUT_FORMAT_HINT,
};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

fn build_router(default_ratio: f64) -> axum::Router {
    let state = Arc::new(AllotmentState {
        calculator: AllotmentCalculator::new(ProbabilityEngine::new()),
        default_ratio,
    });
    allotment_router(state)
}

async fn post_json(router: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request");

    let response = router.oneshot(request).await.expect("router dispatch");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let payload = serde_json::from_slice(&bytes).expect("json");
    (status, payload)
}

#[tokio::test]
async fn estimate_returns_per_category_probabilities() {
    let (status, payload) = post_json(
        build_router(1.0),
        "/api/v1/allotment/estimate",
        json!({
            "applications": "1 retail",
            "subscription_ratios": { "retail": 2.0 }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["summary"], json!("retail"));
    let retail = &payload["categories"][0];
    assert_eq!(retail["category"], json!("retail"));
    assert_eq!(retail["probability"], json!(0.5));
    assert_eq!(retail["at_least"][0]["lots"], json!(1));
    assert_eq!(retail["expected_lots"], json!(0));
    assert_eq!(payload["total_expected_lots"], json!(0));
}

#[tokio::test]
async fn estimate_uses_default_ratio_for_missing_categories() {
    let (status, payload) = post_json(
        build_router(4.0),
        "/api/v1/allotment/estimate",
        json!({ "applications": "shni" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let shni = &payload["categories"][0];
    assert_eq!(shni["subscription_ratio"], json!(4.0));
    assert_eq!(shni["probability"], json!(0.25));
}

#[tokio::test]
async fn invalid_category_preserves_input_for_reprompt() {
    let (status, payload) = post_json(
        build_router(1.0),
        "/api/v1/allotment/estimate",
        json!({ "applications": "2 retail foo" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["error"], json!("invalid category: foo"));
    assert_eq!(payload["applications"], json!("2 retail foo"));
    assert_eq!(payload["hint"], json!(INPUT_FORMAT_HINT));
}

#[tokio::test]
async fn non_positive_ratio_is_rejected() {
    let (status, payload) = post_json(
        build_router(1.0),
        "/api/v1/allotment/estimate",
        json!({
            "applications": "retail",
            "subscription_ratios": { "retail": -1.0 }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = payload["error"].as_str().expect("error message");
    assert!(message.contains("subscription ratio for retail"));
}

#[tokio::test]
async fn unknown_ratio_key_is_rejected_like_an_unknown_tag() {
    let (status, payload) = post_json(
        build_router(1.0),
        "/api/v1/allotment/estimate",
        json!({
            "applications": "retail",
            "subscription_ratios": { "foo": 2.0 }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["error"], json!("invalid category: foo"));
    assert_eq!(payload["applications"], json!("retail"));
    assert_eq!(payload["hint"], json!(INPUT_FORMAT_HINT));
}

#[tokio::test]
async fn ratio_keys_are_case_insensitive() {
    let (status, payload) = post_json(
        build_router(1.0),
        "/api/v1/allotment/estimate",
        json!({
            "applications": "retail",
            "subscription_ratios": { "RETAIL": 4.0 }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["categories"][0]["probability"], json!(0.25));
}

#[tokio::test]
async fn oversized_count_is_rejected_before_expansion() {
    for uri in ["/api/v1/allotment/parse", "/api/v1/allotment/estimate"] {
        let (status, payload) = post_json(
            build_router(1.0),
            uri,
            json!({ "applications": "4294967295 retail" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(payload["error"], json!("invalid category: 4294967295"));
    }
}

#[tokio::test]
async fn parse_reports_categories_and_counts() {
    let (status, payload) = post_json(
        build_router(1.0),
        "/api/v1/allotment/parse",
        json!({ "applications": "2 retail bhni 3 shni" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        payload["categories"],
        json!(["retail", "retail", "bhni", "shni", "shni", "shni"])
    );
    assert_eq!(
        payload["counts"],
        json!({ "retail": 2, "shni": 3, "bhni": 1 })
    );
}

#[tokio::test]
async fn categories_lists_the_catalogue() {
    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/allotment/categories")
        .body(Body::empty())
        .expect("request");

    let response = build_router(1.0)
        .oneshot(request)
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let payload: Value = serde_json::from_slice(&bytes).expect("json");
    let tags: Vec<&str> = payload
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|entry| entry["tag"].as_str())
        .collect();
    assert_eq!(tags, vec!["retail", "shni", "bhni"]);
    assert_eq!(payload[2]["subscription_divisor"], json!(5.0));
    assert_eq!(payload[1]["lots_per_application"], json!(14));
}
