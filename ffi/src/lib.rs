//! C-ABI wrapper around `btcpay-core`.
//!
//! # Overview
//! Exposes the BTCPay client through `extern "C"` functions so any language
//! with a C FFI can call the Greenfield endpoints without linking against
//! serde or a Rust HTTP stack directly. Requests are synchronous and run on
//! the calling thread.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - One function per core operation, mirroring `Miscellaneous` and
//!   `Invoices` 1:1.
//! - A single `FfiResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads and errors uniformly.
//! - Checkout options are built through an opaque builder handle whose
//!   setters return an `FfiErrorCode`; a rejected value leaves the builder
//!   unchanged.
//! - The C caller owns all returned pointers and must call the matching
//!   `btcpay_*_free` / `btcpay_free_*` function to release them.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use btcpay_core::{
    ApiClient, ClientConfig, CreateInvoiceRequest, InvoiceCheckoutOptions,
    InvoiceCheckoutOptionsBuilder,
};
use serde_json::Value;

use types::*;

/// Copy a C string into Rust, replacing invalid UTF-8. Null maps to `None`.
fn read_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Run `f` with panics turned into an `FfiResult`.
fn guarded(name: &str, f: impl FnOnce() -> *mut FfiResult) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|_| FfiResult::panic(&format!("panic in {name}")))
}

fn with_client(
    name: &str,
    client: *const FfiBtcPayClient,
    f: impl FnOnce(&FfiBtcPayClient) -> *mut FfiResult,
) -> *mut FfiResult {
    guarded(name, || {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        f(unsafe { &*client })
    })
}

/// Parse a caller-supplied JSON document.
fn parse_json_arg(name: &str, raw: &str) -> Result<Value, *mut FfiResult> {
    serde_json::from_str(raw)
        .map_err(|e| FfiResult::invalid_argument(format!("{name} is not valid JSON: {e}")))
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client bound to `base_url`. `api_key` may be null for the
/// anonymous endpoints.
///
/// Returns null if `base_url` is null or not an absolute http(s) URL, if
/// `api_key` is empty, or if an internal panic occurs.
/// The caller must free the returned pointer with `btcpay_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_client_new(
    base_url: *const c_char,
    api_key: *const c_char,
) -> *mut FfiBtcPayClient {
    catch_unwind(|| {
        let Some(url) = read_c_str(base_url) else {
            return std::ptr::null_mut();
        };
        let mut config = ClientConfig::new(&url);
        config.api_key = read_c_str(api_key);
        match ApiClient::from_config(&config) {
            Ok(client) => Box::into_raw(Box::new(FfiBtcPayClient::new(client))),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `btcpay_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_client_free(client: *mut FfiBtcPayClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

/// The normalised base URL of a client, without a trailing slash.
///
/// Returns null if `client` is null. Free with `btcpay_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_client_base_url(client: *const FfiBtcPayClient) -> *mut c_char {
    if client.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(AssertUnwindSafe(|| {
        into_c_string(unsafe { &*client }.client.base_url())
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Miscellaneous
// ---------------------------------------------------------------------------

/// `GET /misc/permissions`. Returns `data_tag = PermissionList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_get_permission_metadata(
    client: *const FfiBtcPayClient,
) -> *mut FfiResult {
    with_client("btcpay_get_permission_metadata", client, |c| {
        match c.misc.get_permission_metadata() {
            Ok(list) => FfiResult::ok_permissions(list),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// `GET /misc/lang`. Returns `data_tag = LanguageCodeList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_get_language_codes(client: *const FfiBtcPayClient) -> *mut FfiResult {
    with_client("btcpay_get_language_codes", client, |c| {
        match c.misc.get_language_codes() {
            Ok(list) => FfiResult::ok_language_codes(list),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// `GET /i/{invoice_id}`, optionally `?lang=`. `lang` may be null.
///
/// Returns `data_tag = Text` with the page HTML on success.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_get_invoice_checkout(
    client: *const FfiBtcPayClient,
    invoice_id: *const c_char,
    lang: *const c_char,
) -> *mut FfiResult {
    with_client("btcpay_get_invoice_checkout", client, |c| {
        let Some(invoice_id) = read_c_str(invoice_id) else {
            return FfiResult::null_arg("invoice_id");
        };
        let lang = read_c_str(lang);
        match c.misc.get_invoice_checkout(&invoice_id, lang.as_deref()) {
            Ok(page) => FfiResult::ok_text(page.into_inner()),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

/// Create an invoice in `store_id`.
///
/// `amount`, `currency`, `metadata_json` and `options` may be null.
/// `metadata_json` must be a JSON document when given. Returns
/// `data_tag = Invoice` on success.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_create_invoice(
    client: *const FfiBtcPayClient,
    store_id: *const c_char,
    amount: *const c_char,
    currency: *const c_char,
    metadata_json: *const c_char,
    options: *const FfiCheckoutOptions,
) -> *mut FfiResult {
    with_client("btcpay_create_invoice", client, |c| {
        let Some(store_id) = read_c_str(store_id) else {
            return FfiResult::null_arg("store_id");
        };
        let metadata = match read_c_str(metadata_json) {
            Some(raw) => match parse_json_arg("metadata_json", &raw) {
                Ok(value) => Some(value),
                Err(result) => return result,
            },
            None => None,
        };
        let checkout = if options.is_null() {
            None
        } else {
            Some(unsafe { &*options }.builder.build())
        };
        let request = CreateInvoiceRequest {
            amount: read_c_str(amount),
            currency: read_c_str(currency),
            metadata,
            checkout,
        };
        match c.invoices.create_invoice(&store_id, &request) {
            Ok(invoice) => FfiResult::ok_invoice(invoice),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Fetch one invoice. Returns `data_tag = Invoice` on success.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_get_invoice(
    client: *const FfiBtcPayClient,
    store_id: *const c_char,
    invoice_id: *const c_char,
) -> *mut FfiResult {
    with_client("btcpay_get_invoice", client, |c| {
        let Some(store_id) = read_c_str(store_id) else {
            return FfiResult::null_arg("store_id");
        };
        let Some(invoice_id) = read_c_str(invoice_id) else {
            return FfiResult::null_arg("invoice_id");
        };
        match c.invoices.get_invoice(&store_id, &invoice_id) {
            Ok(invoice) => FfiResult::ok_invoice(invoice),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Replace an invoice's metadata with the JSON document `metadata_json`.
/// Returns `data_tag = Invoice` on success.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_update_invoice_metadata(
    client: *const FfiBtcPayClient,
    store_id: *const c_char,
    invoice_id: *const c_char,
    metadata_json: *const c_char,
) -> *mut FfiResult {
    with_client("btcpay_update_invoice_metadata", client, |c| {
        let Some(store_id) = read_c_str(store_id) else {
            return FfiResult::null_arg("store_id");
        };
        let Some(invoice_id) = read_c_str(invoice_id) else {
            return FfiResult::null_arg("invoice_id");
        };
        let Some(raw) = read_c_str(metadata_json) else {
            return FfiResult::null_arg("metadata_json");
        };
        let metadata = match parse_json_arg("metadata_json", &raw) {
            Ok(value) => value,
            Err(result) => return result,
        };
        match c.invoices.update_invoice_metadata(&store_id, &invoice_id, metadata) {
            Ok(invoice) => FfiResult::ok_invoice(invoice),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Archive an invoice. Returns `data_tag = None` on success.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_archive_invoice(
    client: *const FfiBtcPayClient,
    store_id: *const c_char,
    invoice_id: *const c_char,
) -> *mut FfiResult {
    with_client("btcpay_archive_invoice", client, |c| {
        let Some(store_id) = read_c_str(store_id) else {
            return FfiResult::null_arg("store_id");
        };
        let Some(invoice_id) = read_c_str(invoice_id) else {
            return FfiResult::null_arg("invoice_id");
        };
        match c.invoices.archive_invoice(&store_id, &invoice_id) {
            Ok(()) => FfiResult::ok_empty(),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

// ---------------------------------------------------------------------------
// Checkout options
// ---------------------------------------------------------------------------

fn with_options(
    options: *mut FfiCheckoutOptions,
    f: impl FnOnce(&mut InvoiceCheckoutOptionsBuilder) -> FfiErrorCode,
) -> FfiErrorCode {
    if options.is_null() {
        return FfiErrorCode::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| f(&mut unsafe { &mut *options }.builder)))
        .unwrap_or(FfiErrorCode::Panic)
}

/// -1 = unset, 0 = false, anything else = true.
fn tri_state(value: i32) -> Option<bool> {
    match value {
        -1 => None,
        0 => Some(false),
        _ => Some(true),
    }
}

/// Create an empty checkout options builder. Free with
/// `btcpay_checkout_options_free`.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_checkout_options_new() -> *mut FfiCheckoutOptions {
    catch_unwind(|| {
        Box::into_raw(Box::new(FfiCheckoutOptions {
            builder: InvoiceCheckoutOptions::builder(),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a builder created by `btcpay_checkout_options_new`. Safe to call
/// with null.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_checkout_options_free(options: *mut FfiCheckoutOptions) {
    if !options.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(options) });
        }));
    }
}

/// Set the speed policy by name. Null or `""` clears it.
///
/// Returns `InvalidArgument` for anything but `HighSpeed`, `MediumSpeed`,
/// `LowSpeed` or `LowMediumSpeed`; the previous value is kept.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_checkout_options_set_speed_policy(
    options: *mut FfiCheckoutOptions,
    policy: *const c_char,
) -> FfiErrorCode {
    with_options(options, |b| {
        let policy = read_c_str(policy);
        match b.speed_policy(policy.as_deref()) {
            Ok(_) => FfiErrorCode::Ok,
            Err(e) => FfiErrorCode::from(&e),
        }
    })
}

/// Payment method ids, e.g. `"BTC"`. A null `methods` clears the list.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_checkout_options_set_payment_methods(
    options: *mut FfiCheckoutOptions,
    methods: *const *const c_char,
    len: u32,
) -> FfiErrorCode {
    with_options(options, |b| {
        if methods.is_null() {
            b.payment_methods(None);
            return FfiErrorCode::Ok;
        }
        let raw = unsafe { std::slice::from_raw_parts(methods, len as usize) };
        let mut parsed = Vec::with_capacity(raw.len());
        for ptr in raw {
            match read_c_str(*ptr) {
                Some(m) => parsed.push(m),
                None => return FfiErrorCode::NullArg,
            }
        }
        b.payment_methods(Some(parsed));
        FfiErrorCode::Ok
    })
}

/// Negative clears.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_checkout_options_set_expiration_minutes(
    options: *mut FfiCheckoutOptions,
    minutes: i64,
) -> FfiErrorCode {
    with_options(options, |b| {
        b.expiration_minutes((minutes >= 0).then_some(minutes));
        FfiErrorCode::Ok
    })
}

/// Negative clears.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_checkout_options_set_monitoring_minutes(
    options: *mut FfiCheckoutOptions,
    minutes: i64,
) -> FfiErrorCode {
    with_options(options, |b| {
        b.monitoring_minutes((minutes >= 0).then_some(minutes));
        FfiErrorCode::Ok
    })
}

/// Percentage. Negative or NaN clears.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_checkout_options_set_payment_tolerance(
    options: *mut FfiCheckoutOptions,
    tolerance: f64,
) -> FfiErrorCode {
    with_options(options, |b| {
        b.payment_tolerance((tolerance >= 0.0).then_some(tolerance));
        FfiErrorCode::Ok
    })
}

/// Null clears.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_checkout_options_set_redirect_url(
    options: *mut FfiCheckoutOptions,
    url: *const c_char,
) -> FfiErrorCode {
    with_options(options, |b| {
        b.redirect_url(read_c_str(url));
        FfiErrorCode::Ok
    })
}

/// Tri-state: -1 = unset, 0 = false, 1 = true.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_checkout_options_set_redirect_automatically(
    options: *mut FfiCheckoutOptions,
    value: i32,
) -> FfiErrorCode {
    with_options(options, |b| {
        b.redirect_automatically(tri_state(value));
        FfiErrorCode::Ok
    })
}

/// Null clears.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_checkout_options_set_default_language(
    options: *mut FfiCheckoutOptions,
    language: *const c_char,
) -> FfiErrorCode {
    with_options(options, |b| {
        b.default_language(read_c_str(language));
        FfiErrorCode::Ok
    })
}

/// Tri-state: -1 = unset, 0 = false, 1 = true.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_checkout_options_set_requires_refund_email(
    options: *mut FfiCheckoutOptions,
    value: i32,
) -> FfiErrorCode {
    with_options(options, |b| {
        b.requires_refund_email(tri_state(value));
        FfiErrorCode::Ok
    })
}

/// The options as a JSON object keyed by wire name, unset fields as null.
///
/// Returns null if `options` is null. Free with `btcpay_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_checkout_options_to_json(
    options: *const FfiCheckoutOptions,
) -> *mut c_char {
    if options.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(AssertUnwindSafe(|| {
        let built = unsafe { &*options }.builder.build();
        Value::Object(built.to_map()).to_string()
    }))
    .map(into_c_string)
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiResult` returned by any request function. Safe to call with
/// null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| unsafe { FfiResult::release(result) }));
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn btcpay_free_string(s: *mut c_char) {
    let _ = catch_unwind(|| free_c_string(s));
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
