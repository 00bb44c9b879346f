use crate::app_store_api::config::AppStoreConfig;
use crate::app_store_api::resources::{App, CollectionResponse, ResourceResponse};
use crate::app_store_api::token::{TokenIssuer, TokenPurpose};
use crate::app_store_api::types::{ApiError, AppStoreError};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// HTTP client for the App Store Connect API
///
/// Every request is authorized with a freshly minted bearer token for the
/// purpose of the host it targets. The client holds no other state and is
/// cheap to clone.
#[derive(Debug, Clone)]
pub struct AppStoreClient {
    issuer: TokenIssuer,
    /// HTTP client for making requests
    client: reqwest::Client,
}

impl AppStoreClient {
    /// Create a new App Store Connect API client
    ///
    /// # Example
    ///
    /// ```no_run
    /// use app_store_connect_sdk::{AppStoreClient, AppStoreConfig};
    ///
    /// let client = AppStoreClient::new(AppStoreConfig::from_env())?;
    /// # Ok::<(), app_store_connect_sdk::AppStoreError>(())
    /// ```
    pub fn new(config: AppStoreConfig) -> Result<Self, AppStoreError> {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Create a client that sends requests through an existing `reqwest::Client`
    pub fn with_http_client(
        config: AppStoreConfig,
        client: reqwest::Client,
    ) -> Result<Self, AppStoreError> {
        config.validate()?;
        tracing::debug!(
            "Creating AppStoreClient with base URL: {}",
            config.connect_base_url
        );

        Ok(Self {
            issuer: TokenIssuer::new(config),
            client,
        })
    }

    pub fn config(&self) -> &AppStoreConfig {
        self.issuer.config()
    }

    /// Absolute URL for `path` on the host that `purpose` authorizes
    pub fn url(&self, purpose: TokenPurpose, path: &str) -> String {
        format!(
            "{}{}",
            self.config().base_url_for(purpose).trim_end_matches('/'),
            path
        )
    }

    /// List all apps visible to the API key
    ///
    /// Sends `GET /v1/apps` with a freshly minted Connect token.
    ///
    /// # Returns
    ///
    /// Returns `Ok(Vec<App>)` with the `data` array of the response unchanged,
    /// or `Err(AppStoreError)` if the token cannot be minted or the request
    /// fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use app_store_connect_sdk::{AppStoreClient, AppStoreConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = AppStoreClient::new(AppStoreConfig::from_env())?;
    ///
    /// for app in client.list_apps().await? {
    ///     println!("{}: {:?}", app.id, app.attributes.bundle_id);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list_apps(&self) -> Result<Vec<App>, AppStoreError> {
        // Construct the apps endpoint URL
        let url = self.url(TokenPurpose::Connect, "/v1/apps");
        tracing::debug!("Listing apps from: {}", url);

        let response: CollectionResponse<App> =
            self.get_json(TokenPurpose::Connect, &url, &[]).await?;
        Ok(response.data)
    }

    /// Get a single app by id
    ///
    /// # Arguments
    ///
    /// * `app_id` - The Apple id of the app
    ///
    /// # Returns
    ///
    /// Returns `Ok(App)` if the app exists, or `Err(AppStoreError)` with the
    /// remote status (404 for an unknown id) if the request fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use app_store_connect_sdk::{AppStoreClient, AppStoreConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = AppStoreClient::new(AppStoreConfig::from_env())?;
    /// let app = client.get_app("1234567890").await?;
    /// println!("{:?}", app.attributes.name);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_app(&self, app_id: impl Into<String>) -> Result<App, AppStoreError> {
        let app_id = app_id.into();
        let url = self.url(TokenPurpose::Connect, &format!("/v1/apps/{}", app_id));
        tracing::debug!("Getting app {} from: {}", app_id, url);

        let response: ResourceResponse<App> =
            self.get_json(TokenPurpose::Connect, &url, &[]).await?;
        Ok(response.data)
    }

    /// GET `url` and parse the JSON body
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        purpose: TokenPurpose,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppStoreError> {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = self.execute(purpose, request).await?;
        Self::parse_json(url, response).await
    }

    /// Send `body` as JSON with `method` and parse the JSON response
    pub(crate) async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        purpose: TokenPurpose,
        url: &str,
        body: &B,
    ) -> Result<T, AppStoreError> {
        let request = self.client.request(method, url).json(body);
        let response = self.execute(purpose, request).await?;
        Self::parse_json(url, response).await
    }

    /// Send `body` as JSON with `method`, ignoring any response body
    pub(crate) async fn send_no_content<B: Serialize>(
        &self,
        method: Method,
        purpose: TokenPurpose,
        url: &str,
        body: &B,
    ) -> Result<(), AppStoreError> {
        let request = self.client.request(method, url).json(body);
        self.execute(purpose, request).await?;
        Ok(())
    }

    /// Follow `links.next` from `first_url` until it is absent
    ///
    /// `query` applies to the first request only; next links already carry
    /// their own query string.
    pub(crate) async fn get_all_pages<T: DeserializeOwned>(
        &self,
        purpose: TokenPurpose,
        first_url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, AppStoreError> {
        let mut items = Vec::new();
        let mut page: CollectionResponse<T> = self.get_json(purpose, first_url, query).await?;
        let mut pages = 1;

        loop {
            items.append(&mut page.data);
            match page.links.next.take() {
                Some(next) => {
                    tracing::debug!("Following next page link: {}", next);
                    page = self.get_json(purpose, &next, &[]).await?;
                    pages += 1;
                }
                None => break,
            }
        }

        tracing::debug!(
            "Fetched {} items across {} page(s) from {}",
            items.len(),
            pages,
            first_url
        );
        Ok(items)
    }

    /// Mint a token, send the request and map non-2xx statuses to errors
    async fn execute(
        &self,
        purpose: TokenPurpose,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AppStoreError> {
        let token = self.issuer.issue(purpose)?;

        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request: {}", e);
                ApiError::from(e)
            })?;

        let status = response.status();
        tracing::debug!("Received response with status: {}", status);

        if !status.is_success() {
            let url = response.url().to_string();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            tracing::debug!(
                "Request to {} failed: HTTP {} - {}",
                url,
                status.as_u16(),
                error_body
            );

            return Err(AppStoreError::Api(ApiError::Http {
                status: status.as_u16(),
                message: error_body,
            }));
        }

        Ok(response)
    }

    async fn parse_json<T: DeserializeOwned>(
        url: &str,
        response: reqwest::Response,
    ) -> Result<T, AppStoreError> {
        let response_text = response.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            AppStoreError::Api(ApiError::Parse(format!("Failed to read response: {}", e)))
        })?;

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                "Failed to parse response from {}: {} - Response body: {}",
                url,
                e,
                response_text
            );
            AppStoreError::Api(ApiError::Parse(format!(
                "Failed to parse response: {} - Body: {}",
                e, response_text
            )))
        })
    }
}
