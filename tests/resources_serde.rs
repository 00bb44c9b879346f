//! Resource Serialization Tests
//!
//! Tests for the JSON:API envelopes and resource types: parsing real-shaped
//! responses, request bodies, and the helpers used to dig tester ids out of
//! error documents.

use app_store_connect_sdk::{
    App, BetaGroup, BetaTester, BetaTesterCreateRequest, CollectionResponse, ErrorDocument,
    RelationshipRequest, ResourceResponse, TestNotificationResponse,
};
use serde_json::json;

// ============================================================================
// Envelopes
// ============================================================================

#[test]
fn test_collection_with_next_link() {
    let body = json!({
        "data": [
            {
                "type": "betaTesters",
                "id": "t1",
                "attributes": {
                    "firstName": "Ada",
                    "lastName": "Lovelace",
                    "email": "ada@example.com",
                    "inviteType": "EMAIL"
                }
            }
        ],
        "links": {
            "self": "https://api.appstoreconnect.apple.com/v1/betaTesters?limit=200",
            "next": "https://api.appstoreconnect.apple.com/v1/betaTesters?cursor=Mg&limit=200"
        },
        "meta": { "paging": { "total": 401, "limit": 200 } }
    });

    let page: CollectionResponse<BetaTester> = serde_json::from_value(body).unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].email(), Some("ada@example.com"));
    assert_eq!(page.data[0].attributes.first_name.as_deref(), Some("Ada"));
    assert_eq!(page.data[0].attributes.invite_type.as_deref(), Some("EMAIL"));
    assert!(page.links.next.as_deref().unwrap().contains("cursor=Mg"));
    assert!(page.links.self_link.is_some());
    assert_eq!(page.meta.unwrap()["paging"]["total"], 401);
}

#[test]
fn test_collection_without_links_is_last_page() {
    let page: CollectionResponse<App> = serde_json::from_value(json!({ "data": [] })).unwrap();

    assert!(page.data.is_empty());
    assert!(page.links.next.is_none());
}

#[test]
fn test_resource_response_with_included() {
    let body = json!({
        "data": { "type": "betaTesters", "id": "t1", "attributes": { "email": "a@x.com" } },
        "included": [
            { "type": "betaGroups", "id": "g1", "attributes": { "name": "Beta" } }
        ]
    });

    let response: ResourceResponse<BetaTester> = serde_json::from_value(body).unwrap();

    assert_eq!(response.data.id, "t1");
    assert_eq!(response.included.len(), 1);
    assert_eq!(response.included[0].resource_type, "betaGroups");
    assert_eq!(response.included[0].email(), None);
}

// ============================================================================
// Resources
// ============================================================================

#[test]
fn test_beta_group_attributes() {
    let group: BetaGroup = serde_json::from_value(json!({
        "type": "betaGroups",
        "id": "g1",
        "attributes": {
            "name": "Public Testing",
            "isInternalGroup": false,
            "publicLinkEnabled": true,
            "publicLink": "https://testflight.apple.com/join/abc"
        }
    }))
    .unwrap();

    assert_eq!(group.name(), "Public Testing");
    assert!(!group.is_internal());
    assert_eq!(group.attributes.public_link_enabled, Some(true));
}

#[test]
fn test_tester_without_attributes() {
    let tester: BetaTester =
        serde_json::from_value(json!({ "type": "betaTesters", "id": "t1" })).unwrap();

    assert_eq!(tester.email(), None);
}

#[test]
fn test_test_notification_response() {
    let response: TestNotificationResponse =
        serde_json::from_value(json!({ "testNotificationToken": "tok-123" })).unwrap();
    assert_eq!(response.test_notification_token.as_deref(), Some("tok-123"));

    let empty: TestNotificationResponse = serde_json::from_value(json!({})).unwrap();
    assert!(empty.test_notification_token.is_none());
}

// ============================================================================
// Request bodies
// ============================================================================

#[test]
fn test_create_request_carries_group_relationship() {
    let request = BetaTesterCreateRequest::new(
        "a@x.com",
        Some("Ada".to_string()),
        Some(String::new()),
        "g1",
    );

    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        json!({
            "data": {
                "type": "betaTesters",
                "attributes": { "email": "a@x.com", "firstName": "Ada" },
                "relationships": {
                    "betaGroups": { "data": [{ "type": "betaGroups", "id": "g1" }] }
                }
            }
        })
    );
}

#[test]
fn test_relationship_request_lists_testers() {
    let request = RelationshipRequest::beta_testers(["t1", "t2"]);

    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        json!({
            "data": [
                { "type": "betaTesters", "id": "t1" },
                { "type": "betaTesters", "id": "t2" }
            ]
        })
    );
}

// ============================================================================
// Error documents
// ============================================================================

#[test]
fn test_error_document_existing_resource() {
    let document: ErrorDocument = serde_json::from_value(json!({
        "errors": [
            { "status": "409", "detail": "Tester already exists" },
            {
                "status": "409",
                "meta": { "existingResources": [{ "type": "betaTesters", "id": "t-existing" }] }
            }
        ]
    }))
    .unwrap();

    assert_eq!(document.first_detail(), "Tester already exists");
    assert_eq!(document.existing_resource_id(), Some("t-existing"));
    assert_eq!(document.included_tester_id("a@x.com"), None);
}

#[test]
fn test_error_document_included_tester_match_is_exact() {
    let document: ErrorDocument = serde_json::from_value(json!({
        "errors": [{ "status": "409" }],
        "included": [
            { "type": "betaGroups", "id": "g1", "attributes": { "email": "a@x.com" } },
            { "type": "betaTesters", "id": "t1", "attributes": { "email": "a@x.com" } }
        ]
    }))
    .unwrap();

    assert_eq!(document.first_detail(), "");
    assert_eq!(document.existing_resource_id(), None);
    assert_eq!(document.included_tester_id("a@x.com"), Some("t1"));
    assert_eq!(document.included_tester_id("A@x.com"), None);
}

#[test]
fn test_error_document_tolerates_missing_errors() {
    let document: ErrorDocument = serde_json::from_value(json!({})).unwrap();

    assert!(document.errors.is_empty());
    assert_eq!(document.first_detail(), "");
}
