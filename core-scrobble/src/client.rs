//! Scrobble API Client
//!
//! Issues signed GET and POST calls against the scrobble web service and
//! classifies what comes back.
//!
//! ## Wire format
//!
//! - **GET**: `{scheme}://{host}/{version}/?format=json&{signed params}`
//! - **POST**: `{scheme}://{host}/{version}/?format=json` with the signed
//!   params as an `application/x-www-form-urlencoded` body
//!
//! ## Response handling
//!
//! | Body                          | Result                                  |
//! |-------------------------------|-----------------------------------------|
//! | JSON with an `error` key      | `Ok(ApiResponse::ServiceError)`, logged |
//! | JSON matching the payload     | `Ok(ApiResponse::Success)`              |
//! | Anything else                 | `Ok(ApiResponse::Malformed)`, debug log |
//! | Connection/timeout failure    | `Err(ScrobbleError::Transport)`         |
//!
//! The HTTP status is not consulted: the service reports failures in the
//! body, often with a 4xx status that still carries a valid error envelope.
//!
//! ## Usage
//!
//! ```ignore
//! use core_scrobble::{GetLovedTracks, LovedTracksResponse, ScrobbleClient};
//!
//! let client = ScrobbleClient::new(http_client, api_config)?;
//! let response = client
//!     .get::<_, LovedTracksResponse>(&GetLovedTracks::new("alice", 1, 50))
//!     .await?;
//! ```

use crate::error::{Result, ScrobbleError};
use crate::models::{Acknowledged, ApiError, ApiResponse, LoveTrack, ScrobbleRequest};
use crate::query::{to_form_body, to_query_string};
use crate::signing::RequestParameters;
use bridge_traits::accounts::SessionKey;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use core_runtime::config::ScrobbleApiConfig;
use core_runtime::logging::redact_if_sensitive;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, instrument, trace};

/// Signed client for the scrobble web service
pub struct ScrobbleClient {
    http_client: Arc<dyn HttpClient>,
    config: ScrobbleApiConfig,
}

impl ScrobbleClient {
    /// Creates a client after validating `config`.
    pub fn new(http_client: Arc<dyn HttpClient>, config: ScrobbleApiConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &ScrobbleApiConfig {
        &self.config
    }

    /// Signed GET; parameters travel in the query string.
    #[instrument(skip(self, request), fields(method = request.method()))]
    pub async fn get<Q, R>(&self, request: &Q) -> Result<ApiResponse<R>>
    where
        Q: ScrobbleRequest,
        R: DeserializeOwned,
    {
        let params = self.signed_parameters(request);
        let url = format!(
            "{}&{}",
            self.base_url(request.secure()),
            to_query_string(&params)
        );

        let http_request = HttpRequest::new(HttpMethod::Get, url)
            .header("Accept", "application/json")
            .timeout(self.config.request_timeout());

        self.send(request.method(), http_request).await
    }

    /// Signed POST; parameters travel as a form body.
    #[instrument(skip(self, request), fields(method = request.method()))]
    pub async fn post<Q, R>(&self, request: &Q) -> Result<ApiResponse<R>>
    where
        Q: ScrobbleRequest,
        R: DeserializeOwned,
    {
        let params = self.signed_parameters(request);

        let http_request = HttpRequest::new(HttpMethod::Post, self.base_url(request.secure()))
            .header("Accept", "application/json")
            .form(to_form_body(&params))
            .timeout(self.config.request_timeout());

        self.send(request.method(), http_request).await
    }

    /// Marks a track as loved on the remote account.
    pub async fn love_track(
        &self,
        session_key: &SessionKey,
        artist: &str,
        track: &str,
    ) -> Result<ApiResponse<Acknowledged>> {
        self.set_loved(session_key, artist, track, true).await
    }

    /// Removes a track from the remote account's loved tracks.
    pub async fn unlove_track(
        &self,
        session_key: &SessionKey,
        artist: &str,
        track: &str,
    ) -> Result<ApiResponse<Acknowledged>> {
        self.set_loved(session_key, artist, track, false).await
    }

    async fn set_loved(
        &self,
        session_key: &SessionKey,
        artist: &str,
        track: &str,
        love: bool,
    ) -> Result<ApiResponse<Acknowledged>> {
        if session_key.is_blank() {
            return Err(ScrobbleError::MissingSession);
        }

        let request = LoveTrack {
            artist: artist.to_string(),
            track: track.to_string(),
            session_key: session_key.clone(),
            love,
        };
        self.post(&request).await
    }

    fn base_url(&self, secure: Option<bool>) -> String {
        let scheme = match secure {
            Some(true) => "https",
            Some(false) => "http",
            None => self.config.scheme(),
        };
        format!(
            "{}://{}/{}/?format=json",
            scheme, self.config.host, self.config.api_version
        )
    }

    /// Common parameters plus the request's own, signed with the shared secret.
    fn signed_parameters<Q: ScrobbleRequest>(&self, request: &Q) -> RequestParameters {
        let mut params = request.parameters();
        params.insert("method", request.method());
        params.insert("api_key", self.config.api_key.as_str());
        if let Some(key) = request.session_key() {
            params.insert("sk", key.expose());
        }

        let params = params.signed(&self.config.api_secret);
        for (key, value) in params.iter() {
            trace!(param = key, value = %redact_if_sensitive(key, value), "Request parameter");
        }
        params
    }

    async fn send<R: DeserializeOwned>(
        &self,
        method: &str,
        request: HttpRequest,
    ) -> Result<ApiResponse<R>> {
        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::none())
            .await?;

        debug!(
            status = response.status,
            bytes = response.body.len(),
            "Scrobble service responded"
        );

        Ok(parse_body(method, &response.body))
    }
}

/// Classify a response body into success, service error or malformed.
pub(crate) fn parse_body<R: DeserializeOwned>(method: &str, body: &[u8]) -> ApiResponse<R> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            debug!(method, error = %e, "Response body is not JSON");
            return ApiResponse::Malformed(e.to_string());
        }
    };

    if value.get("error").is_some() {
        return match serde_json::from_value::<ApiError>(value) {
            Ok(api_error) => {
                error!(
                    method,
                    code = api_error.code,
                    service_message = %api_error.message,
                    "Scrobble service returned an error"
                );
                ApiResponse::ServiceError(api_error)
            }
            Err(e) => {
                debug!(method, error = %e, "Unreadable error envelope");
                ApiResponse::Malformed(e.to_string())
            }
        };
    }

    match serde_json::from_value::<R>(value) {
        Ok(payload) => ApiResponse::Success(payload),
        Err(e) => {
            debug!(method, error = %e, "Unexpected response shape");
            ApiResponse::Malformed(e.to_string())
        }
    }
}
