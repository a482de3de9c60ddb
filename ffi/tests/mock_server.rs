//! Drive the C ABI against the live mock server, the way a C caller would.

use std::ffi::{CStr, CString};
use std::net::SocketAddr;
use std::os::raw::c_char;

use btcpay_ffi::types::*;
use btcpay_ffi::*;

const API_KEY: &str = "ffi-key";

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_api_key(listener, API_KEY).await
        })
        .unwrap();
    });

    addr
}

fn new_client(addr: SocketAddr, api_key: Option<&str>) -> *mut FfiBtcPayClient {
    let url = CString::new(format!("http://{addr}")).unwrap();
    let key = api_key.map(|k| CString::new(k).unwrap());
    let client = btcpay_client_new(
        url.as_ptr(),
        key.as_ref().map_or(std::ptr::null(), |k| k.as_ptr()),
    );
    assert!(!client.is_null());
    client
}

fn text(ptr: *const c_char) -> String {
    assert!(!ptr.is_null());
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string()
}

fn invoice_of(result: *mut FfiResult) -> &'static FfiInvoice {
    let r = unsafe { &*result };
    assert_eq!(r.error_code, FfiErrorCode::Ok, "{}", error_message(r));
    assert_eq!(r.data_tag, FfiDataTag::Invoice);
    unsafe { &*(r.data as *const FfiInvoice) }
}

fn error_message(r: &FfiResult) -> String {
    if r.error_message.is_null() {
        String::new()
    } else {
        text(r.error_message)
    }
}

#[test]
fn misc_endpoints() {
    let addr = start_server();
    let client = new_client(addr, None);

    let result = btcpay_get_language_codes(client);
    let r = unsafe { &*result };
    assert_eq!(r.error_code, FfiErrorCode::Ok);
    assert_eq!(r.data_tag, FfiDataTag::LanguageCodeList);
    let list = unsafe { &*(r.data as *const FfiLanguageCodeList) };
    let items = unsafe { std::slice::from_raw_parts(list.items, list.len as usize) };
    let german = items.iter().find(|l| text(l.code) == "de-DE").unwrap();
    assert_eq!(text(german.current_language), "Deutsch");
    btcpay_free_result(result);

    let result = btcpay_get_permission_metadata(client);
    let r = unsafe { &*result };
    assert_eq!(r.error_code, FfiErrorCode::Ok);
    assert_eq!(r.data_tag, FfiDataTag::PermissionList);
    let list = unsafe { &*(r.data as *const FfiPermissionList) };
    let items = unsafe { std::slice::from_raw_parts(list.items, list.len as usize) };
    let unrestricted = items.iter().find(|p| text(p.name) == "unrestricted").unwrap();
    let included =
        unsafe { std::slice::from_raw_parts(unrestricted.included, unrestricted.included_len as usize) };
    assert!(included.iter().any(|p| text(*p) == "btcpay.user.canviewprofile"));
    btcpay_free_result(result);

    let missing = CString::new("nope").unwrap();
    let result = btcpay_get_invoice_checkout(client, missing.as_ptr(), std::ptr::null());
    let r = unsafe { &*result };
    assert_eq!(r.error_code, FfiErrorCode::NotFound);
    assert_eq!(r.http_status, 404);
    btcpay_free_result(result);

    btcpay_client_free(client);
}

#[test]
fn invoice_lifecycle() {
    let addr = start_server();
    let client = new_client(addr, Some(API_KEY));
    let store = CString::new("store1").unwrap();

    // Step 1: create with checkout options.
    let options = btcpay_checkout_options_new();
    let policy = CString::new("LowSpeed").unwrap();
    let lang = CString::new("de-DE").unwrap();
    assert_eq!(
        btcpay_checkout_options_set_speed_policy(options, policy.as_ptr()),
        FfiErrorCode::Ok
    );
    btcpay_checkout_options_set_expiration_minutes(options, 45);
    btcpay_checkout_options_set_default_language(options, lang.as_ptr());

    let amount = CString::new("21.00").unwrap();
    let currency = CString::new("USD").unwrap();
    let metadata = CString::new(r#"{"orderId":"ffi-1"}"#).unwrap();
    let result = btcpay_create_invoice(
        client,
        store.as_ptr(),
        amount.as_ptr(),
        currency.as_ptr(),
        metadata.as_ptr(),
        options,
    );
    btcpay_checkout_options_free(options);
    let created = invoice_of(result);
    assert_eq!(text(created.amount), "21.00");
    assert_eq!(text(created.store_id), "store1");
    assert_eq!(text(created.status), "New");
    assert_eq!(created.expiration_time - created.created_time, 45 * 60);
    assert!(!created.archived);
    let id = CString::new(text(created.id)).unwrap();
    btcpay_free_result(result);

    // Step 2: fetch it back.
    let result = btcpay_get_invoice(client, store.as_ptr(), id.as_ptr());
    let fetched = invoice_of(result);
    let meta: serde_json::Value = serde_json::from_str(&text(fetched.metadata_json)).unwrap();
    assert_eq!(meta["orderId"], "ffi-1");
    btcpay_free_result(result);

    // Step 3: checkout page.
    let result = btcpay_get_invoice_checkout(client, id.as_ptr(), lang.as_ptr());
    let r = unsafe { &*result };
    assert_eq!(r.data_tag, FfiDataTag::Text);
    assert!(text(r.data as *const c_char).contains("lang=\"de-DE\""));
    btcpay_free_result(result);

    // Step 4: update metadata.
    let new_meta = CString::new(r#"{"orderId":"ffi-2"}"#).unwrap();
    let result = btcpay_update_invoice_metadata(client, store.as_ptr(), id.as_ptr(), new_meta.as_ptr());
    let updated = invoice_of(result);
    assert!(text(updated.metadata_json).contains("ffi-2"));
    btcpay_free_result(result);

    // Step 5: archive, then updating is a conflict.
    let result = btcpay_archive_invoice(client, store.as_ptr(), id.as_ptr());
    let r = unsafe { &*result };
    assert_eq!(r.error_code, FfiErrorCode::Ok);
    assert_eq!(r.data_tag, FfiDataTag::None);
    btcpay_free_result(result);

    let result = btcpay_update_invoice_metadata(client, store.as_ptr(), id.as_ptr(), new_meta.as_ptr());
    let r = unsafe { &*result };
    assert_eq!(r.error_code, FfiErrorCode::Conflict);
    assert_eq!(r.http_status, 409);
    btcpay_free_result(result);

    btcpay_client_free(client);
}

#[test]
fn server_errors_surface_status_and_message() {
    let addr = start_server();
    let store = CString::new("store1").unwrap();
    let id = CString::new("x").unwrap();

    let anonymous = new_client(addr, None);
    let result = btcpay_get_invoice(anonymous, store.as_ptr(), id.as_ptr());
    let r = unsafe { &*result };
    assert_eq!(r.error_code, FfiErrorCode::Authentication);
    assert_eq!(r.http_status, 401);
    assert!(error_message(r).contains("Authentication is required"));
    btcpay_free_result(result);
    btcpay_client_free(anonymous);

    let client = new_client(addr, Some(API_KEY));
    let bad_amount = CString::new("-1").unwrap();
    let result = btcpay_create_invoice(
        client,
        store.as_ptr(),
        bad_amount.as_ptr(),
        std::ptr::null(),
        std::ptr::null(),
        std::ptr::null(),
    );
    let r = unsafe { &*result };
    assert_eq!(r.error_code, FfiErrorCode::Validation);
    assert_eq!(r.http_status, 400);
    assert!(error_message(r).contains("amount"));
    btcpay_free_result(result);
    btcpay_client_free(client);
}
