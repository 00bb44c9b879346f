//! App Store Connect SDK
//!
//! A Rust library for the App Store Connect API.
//!
//! This SDK provides:
//! - ES256 API token minting for App Store Connect and the StoreKit server API
//! - Read access to apps
//! - TestFlight beta group management: list groups and testers, add and remove
//!   testers, reconcile a group against a list of emails
//! - A connectivity probe for validating keys
//!
//! # Example
//!
//! ```no_run
//! use app_store_connect_sdk::{AppStoreClient, AppStoreConfig, BetaTesterClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppStoreConfig::from_env();
//! let client = AppStoreClient::new(config)?;
//!
//! for app in client.list_apps().await? {
//!     println!("{} {:?}", app.id, app.attributes.name);
//! }
//!
//! let testers = BetaTesterClient::new(client);
//! let report = testers
//!     .update_public_testing_group(&["alice@example.com", "bob@example.com"])
//!     .await?;
//! println!("added {:?}, removed {:?}", report.added, report.removed);
//! # Ok(())
//! # }
//! ```

pub mod app_store_api;

// Re-export commonly used types and functions
pub use app_store_api::{
    beta_testers::{
        classify_conflict, AddTesterOutcome, BetaTesterClient, ConflictKind, SyncReport,
        TesterLookup, PUBLIC_TESTING_GROUP,
    },
    client::AppStoreClient,
    config::{AppStoreConfig, SigningKeyConfig, StoreKitEnvironment},
    probe::{ConnectivityProbe, ProbeReport},
    resources::{
        App, AppAttributes, BetaGroup, BetaGroupAttributes, BetaTester, BetaTesterAttributes,
        BetaTesterCreateRequest, CollectionResponse, DocumentLinks, ErrorDocument, ErrorMeta,
        ErrorObject, IncludedResource, RelationshipRequest, ResourceIdentifier,
        ResourceResponse, TestNotificationResponse,
    },
    token::{AppStoreClaims, TokenIssuer, TokenPurpose, TOKEN_AUDIENCE, TOKEN_LIFETIME_SECS},
    types::{ApiError, AppStoreError},
};
