//! Result and request DTOs for the BTCPay endpoints.
//!
//! These mirror the Greenfield JSON shapes. Unknown fields are ignored on
//! decode so newer servers do not break older clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::options::InvoiceCheckoutOptions;

/// One API-key permission and the permissions it implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionMetadata {
    pub name: String,
    #[serde(default)]
    pub included: Vec<String>,
}

/// Response of `GET /misc/permissions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMetadataList(pub Vec<PermissionMetadata>);

impl PermissionMetadataList {
    pub fn permissions(&self) -> &[PermissionMetadata] {
        &self.0
    }

    pub fn find(&self, name: &str) -> Option<&PermissionMetadata> {
        self.0.iter().find(|p| p.name == name)
    }
}

/// A checkout language the server can render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageCode {
    pub code: String,
    pub current_language: String,
}

/// Response of `GET /misc/lang`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCodeList(pub Vec<LanguageCode>);

impl LanguageCodeList {
    pub fn codes(&self) -> &[LanguageCode] {
        &self.0
    }

    pub fn find(&self, code: &str) -> Option<&LanguageCode> {
        self.0.iter().find(|l| l.code == code)
    }
}

/// The rendered checkout page of an invoice, as returned by `GET /i/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceCheckoutHtml(String);

impl InvoiceCheckoutHtml {
    pub fn new(html: String) -> Self {
        Self(html)
    }

    pub fn html(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Payload for creating an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    /// Decimal string, e.g. `"10.50"`. Omitted for top-up invoices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout: Option<InvoiceCheckoutOptions>,
}

/// An invoice as returned by the store invoice endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceData {
    pub id: String,
    #[serde(default)]
    pub store_id: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub additional_status: Option<String>,
    #[serde(default)]
    pub checkout_link: Option<String>,
    #[serde(default)]
    pub created_time: Option<i64>,
    #[serde(default)]
    pub expiration_time: Option<i64>,
    #[serde(default)]
    pub monitoring_expiration: Option<i64>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub checkout: Option<Value>,
}
