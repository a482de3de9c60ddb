use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_api_key, Invoice};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- misc ---

#[tokio::test]
async fn language_codes_listed() {
    let resp = app().oneshot(get("/misc/lang")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let langs: Value = body_json(resp).await;
    assert_eq!(langs[0]["code"], "en");
    assert_eq!(langs[0]["currentLanguage"], "English");
}

#[tokio::test]
async fn permissions_listed() {
    let resp = app().oneshot(get("/misc/permissions")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let perms: Value = body_json(resp).await;
    assert_eq!(perms[0]["name"], "unrestricted");
    assert!(perms[0]["included"].as_array().unwrap().len() > 1);
}

#[tokio::test]
async fn checkout_page_unknown_invoice_returns_404() {
    let resp = app().oneshot(get("/i/does-not-exist")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- status echo ---

#[tokio::test]
async fn status_echo_returns_requested_status_and_error_body() {
    let resp = app().oneshot(get("/status/409")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(resp.headers()["x-time"], "12:30");
    let body: Value = body_json(resp).await;
    assert_eq!(body["code"], "status-409");
}

#[tokio::test]
async fn status_echo_rejects_out_of_range() {
    let resp = app().oneshot(get("/status/100")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- auth ---

#[tokio::test]
async fn api_key_required_when_configured() {
    let resp = app_with_api_key("k")
        .oneshot(get("/api/v1/stores/s/invoices"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["code"], "unauthenticated");
}

#[tokio::test]
async fn wrong_api_key_is_forbidden() {
    let req = Request::builder()
        .uri("/api/v1/stores/s/invoices")
        .header(http::header::AUTHORIZATION, "token wrong")
        .body(String::new())
        .unwrap();
    let resp = app_with_api_key("k").oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

// --- create ---

#[tokio::test]
async fn create_invoice_returns_invoice() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/v1/stores/s/invoices",
            r#"{"amount":"10","currency":"USD","checkout":{"expirationMinutes":30}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let invoice: Invoice = body_json(resp).await;
    assert_eq!(invoice.store_id, "s");
    assert_eq!(invoice.status, "New");
    assert_eq!(invoice.expiration_time - invoice.created_time, 30 * 60);
}

#[tokio::test]
async fn create_invoice_invalid_amount_returns_field_errors() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/v1/stores/s/invoices",
            r#"{"amount":"abc"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let errors: Value = body_json(resp).await;
    assert_eq!(errors[0]["path"], "amount");
}

// --- get / update / archive ---

#[tokio::test]
async fn get_invoice_not_found() {
    let resp = app()
        .oneshot(get("/api/v1/stores/s/invoices/missing"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["code"], "invoice-not-found");
}

#[tokio::test]
async fn archive_invoice_not_found() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/stores/s/invoices/missing")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full invoice lifecycle ---

#[tokio::test]
async fn invoice_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/v1/stores/s/invoices",
            r#"{"amount":"5.00","currency":"EUR","metadata":{"orderId":"A1"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created: Invoice = body_json(resp).await;
    let id = created.id.clone();

    // checkout page renders in the requested language
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/i/{id}?lang=de-DE")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
    assert!(html.contains("lang=\"de-DE\""));
    assert!(html.contains(&id));

    // update metadata
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/api/v1/stores/s/invoices/{id}"),
            r#"{"metadata":{"orderId":"A2"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Invoice = body_json(resp).await;
    assert_eq!(updated.metadata["orderId"], "A2");

    // archive
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .method("DELETE")
                .uri(&format!("/api/v1/stores/s/invoices/{id}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_bytes(resp).await.is_empty());

    // archived invoices cannot be modified
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/api/v1/stores/s/invoices/{id}"),
            r#"{"metadata":{}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // list skips archived invoices
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/api/v1/stores/s/invoices"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let invoices: Vec<Invoice> = body_json(resp).await;
    assert!(invoices.is_empty());
}
