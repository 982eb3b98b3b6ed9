//! # Core Configuration Module
//!
//! Provides configuration management for the scrobble sync core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host bridges and the scrobble service settings.
//! It enforces fail-fast validation so that a missing bridge is reported at
//! startup instead of in the middle of a sync pass.
//!
//! ## Required Dependencies
//!
//! - `AccountStore` - Linked accounts and session keys
//! - `LibraryStore` - Local artists and songs
//! - `UserDataStore` - Favorite flags
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, ScrobbleApiConfig};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .api_config(ScrobbleApiConfig::new("my-key", "my-secret"))
//!     .account_store(Arc::new(HostAccounts))
//!     .library_store(Arc::new(HostLibrary))
//!     .user_data_store(Arc::new(HostUserData))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{AccountStore, HttpClient, LibraryStore, UserDataStore};
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_API_HOST: &str = "ws.audioscrobbler.com";
pub const DEFAULT_API_VERSION: &str = "2.0";
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_USER_AGENT: &str = concat!("scrobble-sync/", env!("CARGO_PKG_VERSION"));

/// Settings for the scrobble web service.
///
/// The API key and shared secret identify the application; they should be
/// injected from the host's configuration or the environment, never
/// hardcoded.
#[derive(Clone, PartialEq, Eq)]
pub struct ScrobbleApiConfig {
    pub api_key: String,
    /// Shared secret used to sign requests
    pub api_secret: String,
    pub host: String,
    pub api_version: String,
    /// Use `https` when true
    pub secure: bool,
    pub request_timeout_secs: u64,
    /// Items requested per page when paging loved tracks
    pub page_size: u32,
    pub user_agent: String,
}

impl fmt::Debug for ScrobbleApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrobbleApiConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("host", &self.host)
            .field("api_version", &self.api_version)
            .field("secure", &self.secure)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("page_size", &self.page_size)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for ScrobbleApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            host: DEFAULT_API_HOST.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            secure: true,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ScrobbleApiConfig {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            ..Self::default()
        }
    }

    /// Loads settings from `SCROBBLE_*` environment variables.
    ///
    /// `SCROBBLE_API_KEY` and `SCROBBLE_API_SECRET` are required; host,
    /// scheme and page size fall back to defaults when unset.
    pub fn from_env() -> Result<Self> {
        let api_key = required_var("SCROBBLE_API_KEY")?;
        let api_secret = required_var("SCROBBLE_API_SECRET")?;
        let mut config = Self::new(api_key, api_secret);

        if let Ok(host) = env::var("SCROBBLE_API_HOST") {
            config = config.with_host(host);
        }

        if let Ok(secure) = env::var("SCROBBLE_API_SECURE") {
            config.secure = match secure.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(Error::Config(format!(
                        "SCROBBLE_API_SECURE must be a boolean, got '{}'",
                        other
                    )))
                }
            };
        }

        if let Ok(page_size) = env::var("SCROBBLE_PAGE_SIZE") {
            config.page_size = page_size.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "SCROBBLE_PAGE_SIZE must be a positive integer, got '{}'",
                    page_size
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("Scrobble API key cannot be empty".to_string()));
        }

        if self.api_secret.trim().is_empty() {
            return Err(Error::Config(
                "Scrobble API secret cannot be empty".to_string(),
            ));
        }

        if self.host.trim().is_empty() || self.host.contains('/') {
            return Err(Error::Config(format!(
                "Scrobble API host must be a bare host name, got '{}'",
                self.host
            )));
        }

        if self.api_version.trim().is_empty() {
            return Err(Error::Config(
                "Scrobble API version cannot be empty".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "Request timeout must be greater than 0 seconds".to_string(),
            ));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }

        Ok(())
    }
}

fn required_var(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("{} is not set", name)))
}

/// Core configuration for the scrobble sync core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    pub http_client: Arc<dyn HttpClient>,
    pub account_store: Arc<dyn AccountStore>,
    pub library_store: Arc<dyn LibraryStore>,
    pub user_data_store: Arc<dyn UserDataStore>,
    pub api_config: ScrobbleApiConfig,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("account_store", &"AccountStore { ... }")
            .field("library_store", &"LibraryStore { ... }")
            .field("user_data_store", &"UserDataStore { ... }")
            .field("api_config", &self.api_config)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.api_config.validate()
    }
}

fn missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(api: &ScrobbleApiConfig) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(api.request_timeout(), &api.user_agent)?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_api: &ScrobbleApiConfig) -> Result<Arc<dyn HttpClient>> {
    Err(missing(
        "HttpClient",
        "HttpClient implementation is required to reach the scrobble service. \
         Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
         Otherwise inject the host's HTTP transport.",
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) once every required bridge is
/// set; missing bridges produce `Error::CapabilityMissing`.
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    account_store: Option<Arc<dyn AccountStore>>,
    library_store: Option<Arc<dyn LibraryStore>>,
    user_data_store: Option<Arc<dyn UserDataStore>>,
    api_config: Option<ScrobbleApiConfig>,
}

impl CoreConfigBuilder {
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn account_store(mut self, store: Arc<dyn AccountStore>) -> Self {
        self.account_store = Some(store);
        self
    }

    pub fn library_store(mut self, store: Arc<dyn LibraryStore>) -> Self {
        self.library_store = Some(store);
        self
    }

    pub fn user_data_store(mut self, store: Arc<dyn UserDataStore>) -> Self {
        self.user_data_store = Some(store);
        self
    }

    pub fn api_config(mut self, config: ScrobbleApiConfig) -> Self {
        self.api_config = Some(config);
        self
    }

    /// Builds the final [`CoreConfig`].
    ///
    /// # Errors
    ///
    /// - `Error::Config` when the API settings are missing or invalid
    /// - `Error::CapabilityMissing` when a required bridge was not provided
    pub fn build(self) -> Result<CoreConfig> {
        let api_config = self.api_config.ok_or_else(|| {
            Error::Config(
                "Scrobble API configuration is required. \
                 Use ScrobbleApiConfig::new() or ScrobbleApiConfig::from_env()."
                    .to_string(),
            )
        })?;
        api_config.validate()?;

        let account_store = self.account_store.ok_or_else(|| {
            missing(
                "AccountStore",
                "AccountStore implementation is required to enumerate linked accounts.",
            )
        })?;

        let library_store = self.library_store.ok_or_else(|| {
            missing(
                "LibraryStore",
                "LibraryStore implementation is required to look up local artists and songs.",
            )
        })?;

        let user_data_store = self.user_data_store.ok_or_else(|| {
            missing(
                "UserDataStore",
                "UserDataStore implementation is required to write favorite flags.",
            )
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(&api_config)?,
        };

        Ok(CoreConfig {
            http_client,
            account_store,
            library_store,
            user_data_store,
            api_config,
        })
    }
}
