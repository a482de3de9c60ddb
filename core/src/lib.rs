//! Synchronous client core for the BTCPay Server Greenfield API.
//!
//! # Overview
//! `ApiClient` dispatches requests through a pluggable `Transport` and turns
//! every non-2xx reply into one typed `ApiError`. `SocketTransport` is the
//! built-in transport: one `TcpStream` per call, reply parsed by hand.
//! Endpoint groups (`Miscellaneous`, `Invoices`) share one client through an
//! `Arc` and own their JSON decoding.
//!
//! # Design
//! - The transport fails only when no response was obtained (`ConnectError`).
//! - Status classification happens once, in `ApiClient::send`.
//! - DTOs are immutable; option objects go through a validating builder.
//! - No retries, no redirect following, no connection reuse.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod invoices;
pub mod misc;
pub mod options;
pub mod response;
pub mod socket;
pub mod types;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{
    classify, map_error, ApiError, ConnectError, ConnectErrorCode, ErrorKind, FieldError,
    RequestFailure,
};
pub use http::{HttpMethod, HttpRequest, Transport};
pub use invoices::Invoices;
pub use misc::Miscellaneous;
pub use options::{InvoiceCheckoutOptions, InvoiceCheckoutOptionsBuilder, SpeedPolicy};
pub use response::{Headers, Response};
pub use socket::SocketTransport;
pub use types::{
    CreateInvoiceRequest, InvoiceCheckoutHtml, InvoiceData, LanguageCode, LanguageCodeList,
    PermissionMetadata, PermissionMetadataList,
};
