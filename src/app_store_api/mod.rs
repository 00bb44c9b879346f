/// App Store Connect API integration module
///
/// This module provides token minting, the HTTP client, TestFlight beta
/// group management and a connectivity probe.
///
/// ## Request Flow
///
/// 1. Configuration is loaded once into an `AppStoreConfig`
/// 2. Every request mints a fresh ES256 token for the host it targets
///    (`connect` for App Store Connect, `store-kit` for the StoreKit server API)
/// 3. The token is sent as `Authorization: Bearer <token>`
/// 4. Non-2xx responses surface as `ApiError::Http`, except for the 409s that
///    beta tester management recovers from
pub mod beta_testers;
pub mod client;
pub mod config;
pub mod probe;
pub mod resources;
pub mod token;
pub mod types;

pub use beta_testers::{
    classify_conflict, AddTesterOutcome, BetaTesterClient, ConflictKind, SyncReport,
    TesterLookup, PUBLIC_TESTING_GROUP,
};
pub use client::AppStoreClient;
pub use config::{AppStoreConfig, SigningKeyConfig, StoreKitEnvironment};
pub use probe::{ConnectivityProbe, ProbeReport};
pub use resources::*;
pub use token::{AppStoreClaims, TokenIssuer, TokenPurpose, TOKEN_AUDIENCE, TOKEN_LIFETIME_SECS};
pub use types::{ApiError, AppStoreError};
