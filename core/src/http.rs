//! HTTP request description and the pluggable transport boundary.
//!
//! # Design
//! `ApiClient` builds an `HttpRequest` as plain data and hands its parts to a
//! `Transport`. The transport performs exactly one round trip and reports
//! either a `Response` (any status) or a `ConnectError` when nothing came
//! back. Status interpretation happens one layer up, so tests can swap in a
//! stub transport returning canned responses.

use std::fmt;

use crate::error::ConnectError;
use crate::response::{Headers, Response};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// Built by `ApiClient::build_request`, which has already merged the default
/// headers with the per-call overrides. An empty `body` means no body is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: String,
}

/// Performs one HTTP exchange.
///
/// Implementations must not share connections or buffers between calls and
/// must not retry. A received response is always `Ok`, even for 4xx/5xx.
pub trait Transport: Send + Sync {
    fn request(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &Headers,
        body: &str,
    ) -> Result<Response, ConnectError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn request(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &Headers,
        body: &str,
    ) -> Result<Response, ConnectError> {
        (**self).request(method, url, headers, body)
    }
}
