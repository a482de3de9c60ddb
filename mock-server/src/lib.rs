use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const SPEED_POLICIES: [&str; 4] = ["HighSpeed", "MediumSpeed", "LowSpeed", "LowMediumSpeed"];

const DEFAULT_EXPIRATION_MINUTES: i64 = 15;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub store_id: String,
    pub amount: String,
    pub currency: String,
    pub status: String,
    pub checkout_link: String,
    pub created_time: i64,
    pub expiration_time: i64,
    pub archived: bool,
    pub metadata: Value,
    pub checkout: Value,
}

#[derive(Deserialize)]
pub struct CreateInvoice {
    pub amount: Option<String>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub checkout: Option<Value>,
}

#[derive(Deserialize)]
pub struct UpdateInvoice {
    pub metadata: Value,
}

#[derive(Deserialize)]
pub struct CheckoutQuery {
    pub lang: Option<String>,
}

pub struct AppState {
    api_key: Option<String>,
    invoices: RwLock<HashMap<String, Invoice>>,
}

pub type Db = Arc<AppState>;

type Rejection = (StatusCode, Json<Value>);

/// Router without authentication.
pub fn app() -> Router {
    build(None)
}

/// Router that requires `Authorization: token <api_key>` on `/api/v1`.
pub fn app_with_api_key(api_key: &str) -> Router {
    build(Some(api_key.to_string()))
}

fn build(api_key: Option<String>) -> Router {
    let db: Db = Arc::new(AppState {
        api_key,
        invoices: RwLock::new(HashMap::new()),
    });
    Router::new()
        .route("/misc/permissions", get(permissions))
        .route("/misc/lang", get(languages))
        .route("/i/{id}", get(checkout_page))
        .route("/status/{code}", get(status_echo))
        .route(
            "/api/v1/stores/{store_id}/invoices",
            get(list_invoices).post(create_invoice),
        )
        .route(
            "/api/v1/stores/{store_id}/invoices/{id}",
            get(get_invoice).put(update_invoice).delete(archive_invoice),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_api_key(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_api_key(api_key)).await
}

fn error_body(status: StatusCode, code: &str, message: &str) -> Rejection {
    (status, Json(json!({ "code": code, "message": message })))
}

fn field_error(path: &str, message: &str) -> Rejection {
    (
        StatusCode::BAD_REQUEST,
        Json(json!([{ "path": path, "message": message }])),
    )
}

fn authorize(db: &AppState, headers: &HeaderMap) -> Result<(), Rejection> {
    let Some(key) = &db.api_key else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    match presented {
        Some(value) if value == format!("token {key}") => Ok(()),
        Some(_) => Err(error_body(
            StatusCode::FORBIDDEN,
            "invalid-api-key",
            "The API key is not valid",
        )),
        None => Err(error_body(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "Authentication is required for accessing this endpoint",
        )),
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

async fn permissions() -> Json<Value> {
    Json(json!([
        {
            "name": "unrestricted",
            "included": ["btcpay.store.canmodifystoresettings", "btcpay.user.canviewprofile"]
        },
        {
            "name": "btcpay.store.canmodifystoresettings",
            "included": ["btcpay.store.canviewstoresettings", "btcpay.store.cancreateinvoice"]
        },
        { "name": "btcpay.store.canviewstoresettings", "included": [] },
        { "name": "btcpay.store.cancreateinvoice", "included": [] },
        { "name": "btcpay.user.canviewprofile", "included": [] }
    ]))
}

async fn languages() -> Json<Value> {
    Json(json!([
        { "code": "en", "currentLanguage": "English" },
        { "code": "de-DE", "currentLanguage": "Deutsch" },
        { "code": "es-ES", "currentLanguage": "Español" },
        { "code": "ja-JP", "currentLanguage": "日本語" }
    ]))
}

async fn checkout_page(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(query): Query<CheckoutQuery>,
) -> Result<Html<String>, StatusCode> {
    let invoices = db.invoices.read().await;
    let invoice = invoices.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let lang = query.lang.unwrap_or_else(|| "en".to_string());
    Ok(Html(format!(
        "<!DOCTYPE html><html lang=\"{lang}\"><body><h1>Invoice {}</h1><p>{} {}</p></body></html>",
        invoice.id, invoice.amount, invoice.currency
    )))
}

/// Reply with an arbitrary status. Carries a multi-colon header so clients
/// can observe how they treat it.
async fn status_echo(Path(code): Path<u16>) -> Response {
    let Some(status) = (200..=599)
        .contains(&code)
        .then(|| StatusCode::from_u16(code).ok())
        .flatten()
    else {
        return error_body(StatusCode::BAD_REQUEST, "bad-status", "status must be 200-599")
            .into_response();
    };
    let body = if status.is_success() {
        json!({ "status": code })
    } else {
        json!({ "code": format!("status-{code}"), "message": format!("Echoed status {code}") })
    };
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert("x-time", HeaderValue::from_static("12:30"));
    response
        .headers_mut()
        .insert("x-echo", HeaderValue::from(code));
    response
}

fn validate(input: &CreateInvoice) -> Result<(), Rejection> {
    if let Some(amount) = &input.amount {
        match amount.parse::<f64>() {
            Ok(v) if v > 0.0 => {}
            _ => return Err(field_error("amount", "Amount must be a positive number")),
        }
    }
    if let Some(currency) = &input.currency {
        if currency.len() < 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(field_error("currency", "Invalid currency code"));
        }
    }
    if let Some(policy) = input
        .checkout
        .as_ref()
        .and_then(|c| c.get("speedPolicy"))
        .and_then(Value::as_str)
    {
        if !SPEED_POLICIES.contains(&policy) {
            return Err(field_error("checkout.speedPolicy", "Invalid speed policy"));
        }
    }
    Ok(())
}

async fn list_invoices(
    State(db): State<Db>,
    Path(store_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<Invoice>>, Rejection> {
    authorize(&db, &headers)?;
    let invoices = db.invoices.read().await;
    Ok(Json(
        invoices
            .values()
            .filter(|i| i.store_id == store_id && !i.archived)
            .cloned()
            .collect(),
    ))
}

async fn create_invoice(
    State(db): State<Db>,
    Path(store_id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<CreateInvoice>,
) -> Result<Json<Invoice>, Rejection> {
    authorize(&db, &headers)?;
    validate(&input)?;

    let checkout = input.checkout.unwrap_or(Value::Null);
    let minutes = checkout
        .get("expirationMinutes")
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_EXPIRATION_MINUTES);
    let id = Uuid::new_v4().simple().to_string();
    let created = now();
    let invoice = Invoice {
        checkout_link: format!("/i/{id}"),
        id: id.clone(),
        store_id,
        amount: input.amount.unwrap_or_else(|| "0".to_string()),
        currency: input.currency.unwrap_or_else(|| "USD".to_string()),
        status: "New".to_string(),
        created_time: created,
        expiration_time: created + minutes * 60,
        archived: false,
        metadata: input.metadata.unwrap_or_else(|| json!({})),
        checkout,
    };
    info!(invoice_id = %invoice.id, store_id = %invoice.store_id, "invoice created");
    db.invoices.write().await.insert(id, invoice.clone());
    Ok(Json(invoice))
}

fn invoice_not_found() -> Rejection {
    error_body(StatusCode::NOT_FOUND, "invoice-not-found", "The invoice was not found")
}

async fn get_invoice(
    State(db): State<Db>,
    Path((store_id, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Invoice>, Rejection> {
    authorize(&db, &headers)?;
    let invoices = db.invoices.read().await;
    invoices
        .get(&id)
        .filter(|i| i.store_id == store_id)
        .cloned()
        .map(Json)
        .ok_or_else(invoice_not_found)
}

async fn update_invoice(
    State(db): State<Db>,
    Path((store_id, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(input): Json<UpdateInvoice>,
) -> Result<Json<Invoice>, Rejection> {
    authorize(&db, &headers)?;
    let mut invoices = db.invoices.write().await;
    let invoice = invoices
        .get_mut(&id)
        .filter(|i| i.store_id == store_id)
        .ok_or_else(invoice_not_found)?;
    if invoice.archived {
        return Err(error_body(
            StatusCode::CONFLICT,
            "invoice-archived",
            "Archived invoices cannot be modified",
        ));
    }
    invoice.metadata = input.metadata;
    Ok(Json(invoice.clone()))
}

async fn archive_invoice(
    State(db): State<Db>,
    Path((store_id, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, Rejection> {
    authorize(&db, &headers)?;
    let mut invoices = db.invoices.write().await;
    let invoice = invoices
        .get_mut(&id)
        .filter(|i| i.store_id == store_id)
        .ok_or_else(invoice_not_found)?;
    invoice.archived = true;
    info!(invoice_id = %id, "invoice archived");
    Ok(StatusCode::OK)
}
