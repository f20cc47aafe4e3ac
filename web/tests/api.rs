//! HTTP-level tests: routing, authentication, status mapping, and the JSON
//! wire shapes, served against the in-memory store.

#![allow(clippy::unwrap_used)]

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use marquee_core::access::AccessControl;
use marquee_core::cache::NoopInvalidator;
use marquee_core::extensions::ExtensionRegistry;
use marquee_core::ids::{CategoryId, EventId, ItemId, QuestionId, QuotaId};
use marquee_core::CatalogService;
use marquee_testing::{fixtures, AllowAll, DenyAll, MemoryStore, StaticAvailability};
use marquee_web::{router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;

const EVENT: EventId = EventId::new(1);

fn build_server(store: &MemoryStore, access: Arc<dyn AccessControl>) -> TestServer {
    let service = CatalogService::new(
        Arc::new(store.clone()),
        access.clone(),
        Arc::new(NoopInvalidator),
        Arc::new(StaticAvailability::default()),
        ExtensionRegistry::new(),
    );
    TestServer::new(router(AppState::new(Arc::new(service), access))).unwrap()
}

fn server(store: &MemoryStore) -> TestServer {
    build_server(store, Arc::new(AllowAll))
}

fn denied_server(store: &MemoryStore) -> TestServer {
    build_server(store, Arc::new(DenyAll))
}

fn authed(request: TestRequest) -> TestRequest {
    request.add_header(
        header::AUTHORIZATION,
        HeaderValue::from_static("Bearer admin-token"),
    )
}

#[tokio::test]
async fn liveness_probe_needs_no_token() {
    let store = MemoryStore::default();
    let server = server(&store);

    let response = server.get("/healthz").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn missing_bearer_token_is_unauthorized() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    let server = server(&store);

    let response = server.get("/api/events/1/items").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn denied_actor_causes_no_writes() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    let server = denied_server(&store);

    let response = authed(server.post("/api/events/1/categories"))
        .json(&json!({"name": "Tickets"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["message"], "permission denied");

    assert!(store.categories_of(EVENT).is_empty());
    assert!(store.audit_entries().is_empty());
}

#[tokio::test]
async fn item_listing_groups_uncategorized_first() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    store.seed_category(fixtures::category(10, EVENT, 0));
    store.seed_item(fixtures::item(100, EVENT, Some(CategoryId::new(10)), 0));
    store.seed_item(fixtures::item(101, EVENT, None, 0));
    store.seed_item(fixtures::item(102, EVENT, Some(CategoryId::new(10)), 1));
    let server = server(&store);

    let response = authed(server.get("/api/events/1/items")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let ids: Vec<i64> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![101, 100, 102]);
    assert_eq!(body["categories"][0]["id"], 10);
}

#[tokio::test]
async fn created_item_lands_at_the_end_of_its_scope() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    store.seed_category(fixtures::category(10, EVENT, 0));
    store.seed_item(fixtures::item(100, EVENT, Some(CategoryId::new(10)), 0));
    let server = server(&store);

    let response = authed(server.post("/api/events/1/items"))
        .json(&json!({
            "name": "Late ticket",
            "default_price_cents": 2500,
            "category": 10
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["name"], "Late ticket");
    assert_eq!(body["category"], 10);
    assert_eq!(body["position"], 1);
    assert_eq!(body["active"], true);
    assert!(body["id"].as_i64().unwrap() >= 1000);
}

#[tokio::test]
async fn patch_with_null_clears_internal_name() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    store.seed_item(fixtures::item(100, EVENT, None, 0));
    let server = server(&store);

    let response = authed(server.patch("/api/events/1/items/100"))
        .json(&json!({"internal_name": "backend label"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["internal_name"], "backend label");

    let response = authed(server.patch("/api/events/1/items/100"))
        .json(&json!({"internal_name": null}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["internal_name"], Value::Null);
    assert_eq!(store.item(ItemId::new(100)).unwrap().internal_name, None);
}

#[tokio::test]
async fn deleting_a_referenced_item_disables_it() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    store.seed_item(fixtures::item(100, EVENT, None, 0));
    store.seed_order_reference(ItemId::new(100));
    let server = server(&store);

    let response = authed(server.delete("/api/events/1/items/100")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["outcome"], "disabled");

    let survivor = store.item(ItemId::new(100)).unwrap();
    assert!(!survivor.active);
}

#[tokio::test]
async fn deleting_an_unreferenced_item_removes_it() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    store.seed_item(fixtures::item(100, EVENT, None, 0));
    let server = server(&store);

    let response = authed(server.delete("/api/events/1/items/100")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["outcome"], "deleted");
    assert!(store.item(ItemId::new(100)).is_none());
}

#[tokio::test]
async fn malformed_reorder_body_gets_the_fixed_hint() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    store.seed_category(fixtures::category(10, EVENT, 0));
    store.seed_category(fixtures::category(11, EVENT, 1));
    let server = server(&store);

    let response = authed(server.post("/api/events/1/categories/reorder"))
        .text("not-json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "expected JSON: {ids:[]}");

    // A body without `ids` is just as malformed.
    let response = authed(server.post("/api/events/1/categories/reorder"))
        .json(&json!({"order": ["11", "10"]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "expected JSON: {ids:[]}");

    assert_eq!(store.category(CategoryId::new(10)).unwrap().position, 0);
    assert_eq!(store.category(CategoryId::new(11)).unwrap().position, 1);
    assert!(store.audit_entries().is_empty());
}

#[tokio::test]
async fn category_reorder_applies_the_submitted_order() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    store.seed_category(fixtures::category(10, EVENT, 0));
    store.seed_category(fixtures::category(11, EVENT, 1));
    store.seed_category(fixtures::category(12, EVENT, 2));
    let server = server(&store);

    let response = authed(server.post("/api/events/1/categories/reorder"))
        .json(&json!({"ids": ["12", "10", "11"]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "");

    assert_eq!(store.category(CategoryId::new(12)).unwrap().position, 0);
    assert_eq!(store.category(CategoryId::new(10)).unwrap().position, 1);
    assert_eq!(store.category(CategoryId::new(11)).unwrap().position, 2);
}

#[tokio::test]
async fn incomplete_category_reorder_changes_nothing() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    store.seed_category(fixtures::category(10, EVENT, 0));
    store.seed_category(fixtures::category(11, EVENT, 1));
    let server = server(&store);

    let response = authed(server.post("/api/events/1/categories/reorder"))
        .json(&json!({"ids": ["11"]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["message"], "Not all objects have been selected.");

    assert_eq!(store.category(CategoryId::new(11)).unwrap().position, 1);
}

#[tokio::test]
async fn items_reorder_category_zero_targets_the_uncategorized_scope() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    store.seed_item(fixtures::item(100, EVENT, None, 0));
    store.seed_item(fixtures::item(101, EVENT, None, 1));
    let server = server(&store);

    let response = authed(server.post("/api/events/1/items/reorder/0"))
        .json(&json!({"ids": ["101", "100"]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    assert_eq!(store.item(ItemId::new(101)).unwrap().position, 0);
    assert_eq!(store.item(ItemId::new(100)).unwrap().position, 1);
    assert_eq!(store.item(ItemId::new(100)).unwrap().category, None);
}

#[tokio::test]
async fn mixed_question_reorder_spans_both_channels() {
    let store = MemoryStore::default();
    let mut record = fixtures::event(EVENT);
    record.attendee_fields.names_asked = true;
    record.attendee_fields.emails_asked = true;
    store.seed_event(record);
    store.seed_question(fixtures::question(17, EVENT, 0));
    let server = server(&store);

    let response = authed(server.post("/api/events/1/questions/reorder"))
        .json(&json!({"ids": ["attendee_email", "17", "attendee_name_parts"]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(store.question(QuestionId::new(17)).unwrap().position, 1);

    let response = authed(server.get("/api/events/1/questions")).await;
    let body: Value = response.json();
    let ids: Vec<String> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["attendee_email", "17", "attendee_name_parts"]);
    assert_eq!(body[0]["system"], true);
    assert_eq!(body[1]["system"], false);
    assert_eq!(body[1]["kind"], "text");
}

#[tokio::test]
async fn question_reorder_rejects_unknown_tokens() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    store.seed_question(fixtures::question(17, EVENT, 0));
    let server = server(&store);

    let response = authed(server.post("/api/events/1/questions/reorder"))
        .json(&json!({"ids": ["ghost", "17"]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["message"], "Some of the provided object ids are invalid.");
}

#[tokio::test]
async fn choice_question_without_options_fails_validation() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    let server = server(&store);

    let response = authed(server.post("/api/events/1/questions"))
        .json(&json!({"label": "Shirt size", "kind": "choice"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["errors"]["options"][0]
        .as_str()
        .unwrap()
        .contains("at least one answer option"));
}

#[tokio::test]
async fn quota_list_carries_availability() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    store.seed_item(fixtures::item(100, EVENT, None, 0));
    let mut quota = fixtures::quota(300, EVENT);
    quota.item_ids = vec![ItemId::new(100)];
    store.seed_quota(quota);
    let server = server(&store);

    let response = authed(server.get("/api/events/1/quotas")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body[0]["name"], "Quota 300");
    assert_eq!(body[0]["availability"]["level"], "ok");
    assert_eq!(body[0]["availability"]["code"], 100);
    assert_eq!(body[0]["availability"]["remaining"], Value::Null);
}

#[tokio::test]
async fn reopen_with_keep_open_clears_the_auto_close_flag() {
    let store = MemoryStore::default();
    store.seed_event(fixtures::event(EVENT));
    let mut quota = fixtures::quota(300, EVENT);
    quota.closed = true;
    quota.close_when_sold_out = true;
    store.seed_quota(quota);
    let server = server(&store);

    let response = authed(server.post("/api/events/1/quotas/300/reopen"))
        .json(&json!({"keep_open": true}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["closed"], false);
    assert_eq!(body["close_when_sold_out"], false);

    let stored = store.quota(QuotaId::new(300)).unwrap();
    assert!(!stored.closed);
    assert!(!stored.close_when_sold_out);
}

#[tokio::test]
async fn responses_echo_the_correlation_id() {
    let store = MemoryStore::default();
    let server = server(&store);

    let response = server
        .get("/healthz")
        .add_header(
            HeaderName::from_static("x-correlation-id"),
            HeaderValue::from_static("trace-me-42"),
        )
        .await;
    let headers = response.headers();
    let echoed = headers
        .get("x-correlation-id")
        .and_then(|value| value.to_str().ok())
        .unwrap();
    assert_eq!(echoed, "trace-me-42");

    // Without a client-supplied id the server generates one.
    let response = server.get("/healthz").await;
    let headers = response.headers();
    assert!(headers.get("x-correlation-id").is_some());
}
