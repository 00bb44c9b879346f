//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use app_store_connect_sdk::{AppStoreClient, AppStoreConfig, BetaTesterClient};
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/AuthKey_TEST.p8");
pub const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/AuthKey_TEST.pub.pem");

pub const CONNECT_KEY_ID: &str = "CONNECTKEY1";
pub const STORE_KIT_KEY_ID: &str = "STOREKITKEY1";
pub const APP_ID: &str = "app-1";
pub const GROUP_ID: &str = "group-1";

/// Configuration pointing both hosts at `uri`
pub fn test_config(uri: &str) -> AppStoreConfig {
    AppStoreConfig::new("issuer-123", "com.example.app", APP_ID)
        .with_connect_key(CONNECT_KEY_ID, TEST_PRIVATE_KEY)
        .with_store_kit_key(STORE_KIT_KEY_ID, TEST_PRIVATE_KEY)
        .with_connect_base_url(uri)
        .with_store_kit_base_url(uri)
}

pub fn app_client(server: &MockServer) -> AppStoreClient {
    AppStoreClient::new(test_config(&server.uri())).unwrap()
}

pub fn tester_client(server: &MockServer) -> BetaTesterClient {
    BetaTesterClient::new(app_client(server))
}

pub fn tester_json(id: &str, email: &str) -> Value {
    json!({
        "type": "betaTesters",
        "id": id,
        "attributes": { "email": email, "firstName": null, "lastName": null }
    })
}

pub fn collection(data: Vec<Value>) -> Value {
    json!({ "data": data, "links": { "self": "ignored" } })
}

pub fn conflict_body(detail: &str) -> Value {
    json!({
        "errors": [{ "status": "409", "code": "ENTITY_ERROR", "title": "Conflict", "detail": detail }]
    })
}

/// Kid from the bearer token of a received request
pub fn bearer_kid(request: &wiremock::Request) -> Option<String> {
    let value = request.headers.get("authorization")?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    jsonwebtoken::decode_header(token).ok()?.kid
}

/// Mount `GET /v1/apps/{APP_ID}/betaGroups` returning the given `(id, name)` pairs
pub async fn mount_groups(server: &MockServer, groups: &[(&str, &str)]) {
    let data: Vec<Value> = groups
        .iter()
        .map(|(id, name)| {
            json!({
                "type": "betaGroups",
                "id": id,
                "attributes": { "name": name, "isInternalGroup": false }
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("/v1/apps/{}/betaGroups", APP_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection(data)))
        .mount(server)
        .await;
}

/// Mount `GET /v1/betaGroups/{group_id}/betaTesters` returning `testers`
pub async fn mount_group_testers(server: &MockServer, group_id: &str, testers: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/betaGroups/{}/betaTesters", group_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection(testers)))
        .mount(server)
        .await;
}
