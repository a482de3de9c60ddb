//! Store invoice endpoints under `/api/v1/stores/{storeId}/invoices`.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::{CreateInvoiceRequest, InvoiceData};

#[derive(Debug, Clone)]
pub struct Invoices {
    client: Arc<ApiClient>,
}

impl Invoices {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn create_invoice(
        &self,
        store_id: &str,
        request: &CreateInvoiceRequest,
    ) -> Result<InvoiceData, ApiError> {
        self.client.post_json(&collection_path(store_id), request)
    }

    pub fn get_invoice(&self, store_id: &str, invoice_id: &str) -> Result<InvoiceData, ApiError> {
        self.client.get_json(&item_path(store_id, invoice_id))
    }

    /// Replace the invoice metadata.
    pub fn update_invoice_metadata(
        &self,
        store_id: &str,
        invoice_id: &str,
        metadata: Value,
    ) -> Result<InvoiceData, ApiError> {
        self.client
            .put_json(&item_path(store_id, invoice_id), &json!({ "metadata": metadata }))
    }

    pub fn archive_invoice(&self, store_id: &str, invoice_id: &str) -> Result<(), ApiError> {
        self.client.delete(&item_path(store_id, invoice_id))?;
        Ok(())
    }
}

fn collection_path(store_id: &str) -> String {
    format!(
        "{}/stores/{}/invoices",
        crate::client::API_PREFIX,
        urlencoding::encode(store_id)
    )
}

fn item_path(store_id: &str, invoice_id: &str) -> String {
    format!(
        "{}/{}",
        collection_path(store_id),
        urlencoding::encode(invoice_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectError;
    use crate::http::{HttpMethod, HttpRequest, Transport};
    use crate::options::{InvoiceCheckoutOptions, SpeedPolicy};
    use crate::response::{Headers, Response};
    use std::sync::Mutex;

    struct Recorder {
        status: u16,
        body: String,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Transport for Recorder {
        fn request(
            &self,
            method: HttpMethod,
            url: &str,
            headers: &Headers,
            body: &str,
        ) -> Result<Response, ConnectError> {
            self.seen.lock().unwrap().push(HttpRequest {
                method,
                url: url.to_string(),
                headers: headers.clone(),
                body: body.to_string(),
            });
            Ok(Response::new(self.status, self.body.clone(), Headers::new()))
        }
    }

    const INVOICE: &str = r#"{"id":"inv1","storeId":"store1","amount":"10.00","currency":"USD","status":"New","checkoutLink":"https://pay.example.com/i/inv1","metadata":{"orderId":"42"}}"#;

    fn invoices(status: u16, body: &str) -> (Invoices, Arc<Recorder>) {
        let recorder = Arc::new(Recorder {
            status,
            body: body.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let client = ApiClient::with_transport("https://pay.example.com", recorder.clone())
            .with_api_key("k");
        (Invoices::new(Arc::new(client)), recorder)
    }

    #[test]
    fn create_posts_json_with_checkout_options() {
        let (invoices, recorder) = invoices(200, INVOICE);
        let mut checkout = InvoiceCheckoutOptions::builder();
        checkout.speed(SpeedPolicy::HighSpeed).expiration_minutes(Some(30));
        let request = CreateInvoiceRequest {
            amount: Some("10.00".into()),
            currency: Some("USD".into()),
            metadata: Some(json!({"orderId": "42"})),
            checkout: Some(checkout.build()),
        };

        let invoice = invoices.create_invoice("store1", &request).unwrap();
        assert_eq!(invoice.id, "inv1");
        assert_eq!(invoice.metadata["orderId"], "42");

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].method, HttpMethod::Post);
        assert_eq!(seen[0].url, "https://pay.example.com/api/v1/stores/store1/invoices");
        let body: Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body["checkout"]["speedPolicy"], "HighSpeed");
        assert_eq!(body["checkout"]["expirationMinutes"], 30);
        assert!(body["checkout"]["redirectURL"].is_null());
    }

    #[test]
    fn get_encodes_path_segments() {
        let (invoices, recorder) = invoices(200, INVOICE);
        invoices.get_invoice("store 1", "inv/1").unwrap();
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].method, HttpMethod::Get);
        assert_eq!(
            seen[0].url,
            "https://pay.example.com/api/v1/stores/store%201/invoices/inv%2F1"
        );
    }

    #[test]
    fn update_metadata_puts_wrapped_object() {
        let (invoices, recorder) = invoices(200, INVOICE);
        invoices
            .update_invoice_metadata("store1", "inv1", json!({"note": "gift"}))
            .unwrap();
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].method, HttpMethod::Put);
        let body: Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body, json!({"metadata": {"note": "gift"}}));
    }

    #[test]
    fn archive_sends_delete_and_ignores_body() {
        let (invoices, recorder) = invoices(200, "");
        invoices.archive_invoice("store1", "inv1").unwrap();
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].method, HttpMethod::Delete);
        assert!(seen[0].body.is_empty());
    }

    #[test]
    fn validation_error_surfaces_field_details() {
        let (invoices, _) = invoices(400, r#"[{"path":"currency","message":"Unknown currency"}]"#);
        let err = invoices
            .create_invoice("store1", &CreateInvoiceRequest::default())
            .unwrap_err();
        match err {
            ApiError::Validation { failure, errors } => {
                assert_eq!(failure.method, HttpMethod::Post);
                assert_eq!(errors[0].path, "currency");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn forbidden_is_authentication_error() {
        let (invoices, _) = invoices(403, r#"{"code":"missing-permission","message":"Insufficient API Permissions"}"#);
        let err = invoices.get_invoice("store1", "inv1").unwrap_err();
        assert!(matches!(err, ApiError::Authentication(f) if f.status == 403));
    }
}
