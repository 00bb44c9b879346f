//! Configuration for App Store Connect and StoreKit access.
//!
//! Configuration is loaded once (usually from the process environment) into an
//! immutable [`AppStoreConfig`] that is handed to the token issuer and the
//! clients. Nothing below this module reads the environment.

use crate::app_store_api::token::TokenPurpose;
use crate::app_store_api::types::AppStoreError;
use secrecy::SecretString;

/// Default App Store Connect API host
pub const DEFAULT_CONNECT_BASE_URL: &str = "https://api.appstoreconnect.apple.com";
/// StoreKit server API host (production)
pub const STORE_KIT_PRODUCTION_URL: &str = "https://api.storekit.itunes.apple.com";
/// StoreKit server API host (sandbox)
pub const STORE_KIT_SANDBOX_URL: &str = "https://api.storekit-sandbox.itunes.apple.com";

pub const ENV_ISSUER_ID: &str = "APP_STORE_ISSUER_ID";
pub const ENV_BUNDLE_ID: &str = "APP_STORE_BUNDLE_ID";
pub const ENV_APP_ID: &str = "APP_APPLE_ID";
pub const ENV_CONNECT_KEY: &str = "APP_STORE_CONNECT_KEY";
pub const ENV_CONNECT_KEY_ID: &str = "APP_STORE_CONNECT_KEY_ID";
pub const ENV_STORE_KIT_KEY: &str = "APP_STORE_KIT_KEY";
pub const ENV_STORE_KIT_KEY_ID: &str = "APP_STORE_KIT_KEY_ID";
pub const ENV_IS_LOCAL: &str = "APP_IS_LOCAL";
pub const ENV_CONNECT_BASE_URL: &str = "APP_STORE_CONNECT_BASE_URL";
pub const ENV_STORE_KIT_SANDBOX: &str = "APP_STORE_KIT_SANDBOX";

/// StoreKit server environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKitEnvironment {
    #[default]
    Production,
    Sandbox,
}

impl StoreKitEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            StoreKitEnvironment::Production => STORE_KIT_PRODUCTION_URL,
            StoreKitEnvironment::Sandbox => STORE_KIT_SANDBOX_URL,
        }
    }
}

/// Key id and private key material for one token purpose
///
/// `private_key` holds either the PEM itself or, in local mode, the path of
/// the `.p8` file containing it.
#[derive(Debug, Clone)]
pub struct SigningKeyConfig {
    pub key_id: String,
    pub private_key: SecretString,
}

impl SigningKeyConfig {
    pub fn new(key_id: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            private_key: SecretString::new(private_key.into()),
        }
    }
}

impl Default for SigningKeyConfig {
    fn default() -> Self {
        Self::new(String::new(), String::new())
    }
}

/// App Store Connect SDK configuration
///
/// Built either from the environment with [`AppStoreConfig::from_env`] or
/// programmatically with the `with_*` builder methods.
#[derive(Debug, Clone)]
pub struct AppStoreConfig {
    /// Issuer id from the App Store Connect API keys page (`iss` claim)
    pub issuer_id: String,
    /// Bundle id of the app (`bid` claim)
    pub bundle_id: String,
    /// Apple id of the app; scopes beta group listing
    pub app_id: String,
    /// Key used for App Store Connect tokens
    pub connect_key: SigningKeyConfig,
    /// Key used for StoreKit server API tokens
    pub store_kit_key: SigningKeyConfig,
    /// When set, key material values are file paths to read the PEM from
    pub local_mode: bool,
    pub connect_base_url: String,
    pub store_kit_base_url: String,
}

impl Default for AppStoreConfig {
    fn default() -> Self {
        Self {
            issuer_id: String::new(),
            bundle_id: String::new(),
            app_id: String::new(),
            connect_key: SigningKeyConfig::default(),
            store_kit_key: SigningKeyConfig::default(),
            local_mode: false,
            connect_base_url: DEFAULT_CONNECT_BASE_URL.to_string(),
            store_kit_base_url: STORE_KIT_PRODUCTION_URL.to_string(),
        }
    }
}

impl AppStoreConfig {
    pub fn new(
        issuer_id: impl Into<String>,
        bundle_id: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Self {
        Self {
            issuer_id: issuer_id.into(),
            bundle_id: bundle_id.into(),
            app_id: app_id.into(),
            ..Self::default()
        }
    }

    /// Load configuration from the process environment
    ///
    /// Missing variables become empty values; token minting reports them as
    /// configuration errors when (and only when) they are needed.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load `.env.<profile>` (if present) into the environment, then read it
    ///
    /// Variables already set in the process environment take precedence.
    pub fn from_env_profile(profile: &str) -> Self {
        let file = format!(".env.{}", profile);
        match dotenvy::from_filename(&file) {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) => tracing::debug!("No environment file {} loaded: {}", file, e),
        }
        Self::from_env()
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();
        let flag = |key: &str| {
            lookup(key)
                .map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
                .unwrap_or(false)
        };

        let connect_base_url = lookup(ENV_CONNECT_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONNECT_BASE_URL.to_string());
        let store_kit_environment = if flag(ENV_STORE_KIT_SANDBOX) {
            StoreKitEnvironment::Sandbox
        } else {
            StoreKitEnvironment::Production
        };

        Self {
            issuer_id: get(ENV_ISSUER_ID),
            bundle_id: get(ENV_BUNDLE_ID),
            app_id: get(ENV_APP_ID),
            connect_key: SigningKeyConfig::new(get(ENV_CONNECT_KEY_ID), get(ENV_CONNECT_KEY)),
            store_kit_key: SigningKeyConfig::new(
                get(ENV_STORE_KIT_KEY_ID),
                get(ENV_STORE_KIT_KEY),
            ),
            local_mode: flag(ENV_IS_LOCAL),
            connect_base_url,
            store_kit_base_url: store_kit_environment.base_url().to_string(),
        }
    }

    /// Set the App Store Connect key (builder pattern)
    pub fn with_connect_key(
        mut self,
        key_id: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        self.connect_key = SigningKeyConfig::new(key_id, private_key);
        self
    }

    /// Set the StoreKit key (builder pattern)
    pub fn with_store_kit_key(
        mut self,
        key_id: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        self.store_kit_key = SigningKeyConfig::new(key_id, private_key);
        self
    }

    /// Treat key material as file paths (builder pattern)
    pub fn with_local_mode(mut self, local_mode: bool) -> Self {
        self.local_mode = local_mode;
        self
    }

    /// Override the App Store Connect host (builder pattern)
    pub fn with_connect_base_url(mut self, url: impl Into<String>) -> Self {
        self.connect_base_url = url.into();
        self
    }

    /// Override the StoreKit host (builder pattern)
    pub fn with_store_kit_base_url(mut self, url: impl Into<String>) -> Self {
        self.store_kit_base_url = url.into();
        self
    }

    /// Select the StoreKit production or sandbox host (builder pattern)
    pub fn with_store_kit_environment(mut self, environment: StoreKitEnvironment) -> Self {
        self.store_kit_base_url = environment.base_url().to_string();
        self
    }

    /// Key configuration for a token purpose
    pub fn key_for(&self, purpose: TokenPurpose) -> &SigningKeyConfig {
        match purpose {
            TokenPurpose::Connect => &self.connect_key,
            TokenPurpose::StoreKit => &self.store_kit_key,
        }
    }

    /// Base URL of the host a token purpose authorizes
    pub fn base_url_for(&self, purpose: TokenPurpose) -> &str {
        match purpose {
            TokenPurpose::Connect => &self.connect_base_url,
            TokenPurpose::StoreKit => &self.store_kit_base_url,
        }
    }

    /// Check that both base URLs are absolute http(s) URLs
    pub fn validate(&self) -> Result<(), AppStoreError> {
        for (name, value) in [
            ("connect_base_url", &self.connect_base_url),
            ("store_kit_base_url", &self.store_kit_base_url),
        ] {
            let parsed = url::Url::parse(value).map_err(|e| {
                AppStoreError::Config(format!("Invalid {} '{}': {}", name, value, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppStoreError::Config(format!(
                    "Invalid {} '{}': scheme must be http or https",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
