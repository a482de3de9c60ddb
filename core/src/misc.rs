//! Server-level lookups that sit outside the `/api/v1` prefix.

use std::sync::Arc;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::{InvoiceCheckoutHtml, LanguageCodeList, PermissionMetadataList};

#[derive(Debug, Clone)]
pub struct Miscellaneous {
    client: Arc<ApiClient>,
}

impl Miscellaneous {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// All API-key permissions the server knows about.
    pub fn get_permission_metadata(&self) -> Result<PermissionMetadataList, ApiError> {
        self.client.get_json("/misc/permissions")
    }

    /// Languages the checkout page can be rendered in.
    pub fn get_language_codes(&self) -> Result<LanguageCodeList, ApiError> {
        self.client.get_json("/misc/lang")
    }

    /// Rendered checkout page for an invoice, optionally in a given language.
    pub fn get_invoice_checkout(
        &self,
        invoice_id: &str,
        lang: Option<&str>,
    ) -> Result<InvoiceCheckoutHtml, ApiError> {
        let mut path = format!("/i/{}", urlencoding::encode(invoice_id));
        if let Some(lang) = lang {
            path.push_str("?lang=");
            path.push_str(&urlencoding::encode(lang));
        }
        let response = self.client.get(&path)?;
        Ok(InvoiceCheckoutHtml::new(response.into_body()))
    }
}
