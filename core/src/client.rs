//! Shared dispatch layer for every BTCPay endpoint group.
//!
//! # Design
//! `ApiClient` owns a base URL, a `Transport` and the default headers. Each
//! call is linear: `build_request` merges defaults with per-call overrides,
//! `send` hands the request to the transport and `check_status` either
//! returns the 2xx response untouched or converts it into its typed error.
//! There is no state carried between calls, so one client is shared by
//! reference-counting across endpoint groups.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{map_error, ApiError};
use crate::http::{HttpMethod, HttpRequest, Transport};
use crate::response::{Headers, Response};
use crate::socket::SocketTransport;

/// Path prefix of the Greenfield API below the server URL.
pub const API_PREFIX: &str = "/api/v1";

pub const DEFAULT_USER_AGENT: &str = concat!("btcpay-rust/", env!("CARGO_PKG_VERSION"));

/// Synchronous client bound to one BTCPay server.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    default_headers: Headers,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted: Vec<&str> = self.default_headers.keys().map(String::as_str).collect();
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("default_headers", &redacted)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client with the default `SocketTransport` and no API key.
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(base_url, Arc::new(SocketTransport::new()))
    }

    pub fn with_transport(base_url: &str, transport: Arc<dyn Transport>) -> Self {
        let mut default_headers = Headers::new();
        default_headers.insert("Content-Type".to_string(), "application/json".to_string());
        default_headers.insert("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            default_headers,
        }
    }

    /// Build a client and its socket transport from configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let transport = SocketTransport::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .verify_tls(config.verify_tls)
            .build();
        let mut client = Self::with_transport(&config.base_url, Arc::new(transport));
        if let Some(key) = &config.api_key {
            client = client.with_api_key(key);
        }
        if let Some(agent) = &config.user_agent {
            client = client.with_default_header("User-Agent", agent);
        }
        Ok(client)
    }

    /// Send `Authorization: token <key>` on every request.
    pub fn with_api_key(self, api_key: &str) -> Self {
        self.with_default_header("Authorization", &format!("token {api_key}"))
    }

    pub fn with_default_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `base_url` plus the Greenfield API prefix.
    pub fn api_url(&self) -> String {
        format!("{}{API_PREFIX}", self.base_url)
    }

    pub fn default_headers(&self) -> &Headers {
        &self.default_headers
    }

    /// Describe a request. `url` is used as-is; per-call headers override
    /// defaults with the same name.
    pub fn build_request(
        &self,
        method: HttpMethod,
        url: &str,
        overrides: &Headers,
        body: &str,
    ) -> HttpRequest {
        let mut headers = self.default_headers.clone();
        headers.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body: body.to_string(),
        }
    }

    /// Dispatch a built request. Connect failures are returned as-is;
    /// non-2xx responses are classified.
    pub fn send(&self, request: &HttpRequest) -> Result<Response, ApiError> {
        let response = self
            .transport
            .request(request.method, &request.url, &request.headers, &request.body)
            .inspect_err(|e| debug!(method = %request.method, url = %request.url, error = %e, "transport failed"))?;
        debug!(method = %request.method, url = %request.url, status = response.status(), "dispatched");
        check_status(request.method, &request.url, response)
    }

    /// Build and send in one step against an absolute URL.
    pub fn request(
        &self,
        method: HttpMethod,
        url: &str,
        overrides: &Headers,
        body: &str,
    ) -> Result<Response, ApiError> {
        self.send(&self.build_request(method, url, overrides, body))
    }

    pub fn get(&self, path: &str) -> Result<Response, ApiError> {
        self.request(HttpMethod::Get, &self.url_for(path), &Headers::new(), "")
    }

    pub fn post(&self, path: &str, body: &str) -> Result<Response, ApiError> {
        self.request(HttpMethod::Post, &self.url_for(path), &Headers::new(), body)
    }

    pub fn put(&self, path: &str, body: &str) -> Result<Response, ApiError> {
        self.request(HttpMethod::Put, &self.url_for(path), &Headers::new(), body)
    }

    pub fn delete(&self, path: &str) -> Result<Response, ApiError> {
        self.request(HttpMethod::Delete, &self.url_for(path), &Headers::new(), "")
    }

    /// GET and decode the JSON body.
    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        decode_json(&self.get(path)?)
    }

    /// POST a JSON-encoded payload and decode the JSON reply.
    pub fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<T, ApiError> {
        decode_json(&self.post(path, &encode_json(payload)?)?)
    }

    /// PUT a JSON-encoded payload and decode the JSON reply.
    pub fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<T, ApiError> {
        decode_json(&self.put(path, &encode_json(payload)?)?)
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

/// Pass 2xx responses through; map everything else to its `ApiError`.
fn check_status(method: HttpMethod, url: &str, response: Response) -> Result<Response, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    let err = map_error(method, url, &response);
    warn!(%method, url, status = response.status(), error = %err, "request failed");
    Err(err)
}

pub(crate) fn encode_json<B: Serialize + ?Sized>(payload: &B) -> Result<String, ApiError> {
    serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))
}

pub(crate) fn decode_json<T: DeserializeOwned>(response: &Response) -> Result<T, ApiError> {
    serde_json::from_str(response.body()).map_err(|e| ApiError::Deserialization(e.to_string()))
}
