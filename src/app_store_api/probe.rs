use crate::app_store_api::client::AppStoreClient;
use crate::app_store_api::config::AppStoreConfig;
use crate::app_store_api::resources::TestNotificationResponse;
use crate::app_store_api::token::TokenPurpose;
use crate::app_store_api::types::AppStoreError;
use reqwest::Method;

/// Result of a full connectivity check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Number of apps returned by App Store Connect
    pub app_count: usize,
    /// Token Apple returned for the test notification, if any
    pub test_notification_token: Option<String>,
}

/// Checks that the configured keys are accepted by Apple
///
/// Each check mints its own token and propagates any failure unchanged.
#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    client: AppStoreClient,
}

impl ConnectivityProbe {
    pub fn new(client: AppStoreClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: AppStoreConfig) -> Result<Self, AppStoreError> {
        Ok(Self::new(AppStoreClient::new(config)?))
    }

    /// List apps with a Connect token; returns how many were visible
    pub async fn check_connect(&self) -> Result<usize, AppStoreError> {
        let apps = self.client.list_apps().await.map_err(|e| {
            tracing::error!("App Store Connect check failed: {}", e);
            e
        })?;

        tracing::info!("App Store Connect check passed: {} app(s) visible", apps.len());
        Ok(apps.len())
    }

    /// Ask the StoreKit server API to send a test notification
    pub async fn check_store_kit(&self) -> Result<Option<String>, AppStoreError> {
        let url = self
            .client
            .url(TokenPurpose::StoreKit, "/inApps/v1/notifications/test");
        tracing::debug!("Requesting test notification from: {}", url);

        let response: TestNotificationResponse = self
            .client
            .send_json(
                Method::POST,
                TokenPurpose::StoreKit,
                &url,
                &serde_json::json!({}),
            )
            .await
            .map_err(|e| {
                tracing::error!("StoreKit test notification failed: {}", e);
                e
            })?;

        tracing::info!(
            "StoreKit test notification requested: token={:?}",
            response.test_notification_token
        );
        Ok(response.test_notification_token)
    }

    /// Run both checks, Connect first
    pub async fn run(&self) -> Result<ProbeReport, AppStoreError> {
        let app_count = self.check_connect().await?;
        let test_notification_token = self.check_store_kit().await?;

        Ok(ProbeReport {
            app_count,
            test_notification_token,
        })
    }
}
