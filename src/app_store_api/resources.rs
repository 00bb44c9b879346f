use serde::{Deserialize, Serialize};

/// Resource type name for beta testers
pub const BETA_TESTERS_TYPE: &str = "betaTesters";
/// Resource type name for beta groups
pub const BETA_GROUPS_TYPE: &str = "betaGroups";

/// Collection response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub links: DocumentLinks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// Document links; `next` is an absolute URL and is absent on the last page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentLinks {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Single resource response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceResponse<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<IncludedResource>,
}

/// `{type, id}` reference used by relationship payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn beta_tester(id: impl Into<String>) -> Self {
        Self {
            resource_type: BETA_TESTERS_TYPE.to_string(),
            id: id.into(),
        }
    }

    pub fn beta_group(id: impl Into<String>) -> Self {
        Self {
            resource_type: BETA_GROUPS_TYPE.to_string(),
            id: id.into(),
        }
    }
}

/// Loosely typed resource from an `included` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncludedResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

impl IncludedResource {
    /// The `email` attribute, if this resource carries one
    pub fn email(&self) -> Option<&str> {
        self.attributes.get("email").and_then(|v| v.as_str())
    }
}

/// Error response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDocument {
    #[serde(default)]
    pub errors: Vec<ErrorObject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<IncludedResource>,
}

/// Single entry of an error response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub meta: Option<ErrorMeta>,
}

/// Error metadata; conflicts sometimes echo the existing resource here
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMeta {
    #[serde(default)]
    pub existing_resources: Vec<ResourceIdentifier>,
}

impl ErrorDocument {
    /// Detail text of the first error, or an empty string
    pub fn first_detail(&self) -> &str {
        self.errors
            .first()
            .and_then(|e| e.detail.as_deref())
            .unwrap_or("")
    }

    /// Id of the first existing resource echoed in any error's meta
    pub fn existing_resource_id(&self) -> Option<&str> {
        self.errors
            .iter()
            .filter_map(|e| e.meta.as_ref())
            .find_map(|meta| meta.existing_resources.first())
            .map(|r| r.id.as_str())
    }

    /// Id of an included beta tester whose email matches exactly
    pub fn included_tester_id(&self, email: &str) -> Option<&str> {
        self.included
            .iter()
            .find(|r| r.resource_type == BETA_TESTERS_TYPE && r.email() == Some(email))
            .map(|r| r.id.as_str())
    }
}

/// App resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    #[serde(default)]
    pub attributes: AppAttributes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub primary_locale: Option<String>,
}

/// Beta group resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetaGroup {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    #[serde(default)]
    pub attributes: BetaGroupAttributes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetaGroupAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_internal_group: Option<bool>,
    #[serde(default)]
    pub public_link_enabled: Option<bool>,
    #[serde(default)]
    pub public_link: Option<String>,
}

impl BetaGroup {
    pub fn name(&self) -> &str {
        &self.attributes.name
    }

    pub fn is_internal(&self) -> bool {
        self.attributes.is_internal_group.unwrap_or(false)
    }
}

/// Beta tester resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetaTester {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    #[serde(default)]
    pub attributes: BetaTesterAttributes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetaTesterAttributes {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub invite_type: Option<String>,
}

impl BetaTester {
    pub fn email(&self) -> Option<&str> {
        self.attributes.email.as_deref()
    }
}

/// Request body for `POST /v1/betaTesters`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetaTesterCreateRequest {
    pub data: BetaTesterCreateData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetaTesterCreateData {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub attributes: BetaTesterCreateAttributes,
    pub relationships: BetaTesterCreateRelationships,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetaTesterCreateAttributes {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetaTesterCreateRelationships {
    pub beta_groups: RelationshipRequest,
}

impl BetaTesterCreateRequest {
    /// Create a tester that is attached to `group_id` in the same request
    pub fn new(
        email: impl Into<String>,
        first_name: Option<String>,
        last_name: Option<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            data: BetaTesterCreateData {
                resource_type: BETA_TESTERS_TYPE.to_string(),
                attributes: BetaTesterCreateAttributes {
                    email: email.into(),
                    first_name: first_name.filter(|n| !n.is_empty()),
                    last_name: last_name.filter(|n| !n.is_empty()),
                },
                relationships: BetaTesterCreateRelationships {
                    beta_groups: RelationshipRequest {
                        data: vec![ResourceIdentifier::beta_group(group_id)],
                    },
                },
            },
        }
    }
}

/// Relationship linkage body: `{"data": [{"type": ..., "id": ...}]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipRequest {
    pub data: Vec<ResourceIdentifier>,
}

impl RelationshipRequest {
    pub fn beta_testers<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data: ids.into_iter().map(ResourceIdentifier::beta_tester).collect(),
        }
    }
}

/// Response of the StoreKit test notification endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNotificationResponse {
    #[serde(default)]
    pub test_notification_token: Option<String>,
}
