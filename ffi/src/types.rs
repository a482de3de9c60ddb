//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, pointer + length instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion and release helpers
//! live here to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::sync::Arc;

use btcpay_core::{
    ApiClient, ApiError, InvoiceCheckoutOptionsBuilder, InvoiceData, Invoices, LanguageCodeList,
    Miscellaneous, PermissionMetadataList,
};

/// Opaque handle to a configured client. C callers receive a pointer to this
/// and pass it back into every request function.
pub struct FfiBtcPayClient {
    pub(crate) client: Arc<ApiClient>,
    pub(crate) misc: Miscellaneous,
    pub(crate) invoices: Invoices,
}

impl FfiBtcPayClient {
    pub(crate) fn new(client: ApiClient) -> Self {
        let client = Arc::new(client);
        Self {
            misc: Miscellaneous::new(client.clone()),
            invoices: Invoices::new(client.clone()),
            client,
        }
    }
}

/// Opaque handle to a checkout options builder.
pub struct FfiCheckoutOptions {
    pub(crate) builder: InvoiceCheckoutOptionsBuilder,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult` and by the option setters.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Connect = 1,
    Validation = 2,
    Authentication = 3,
    NotFound = 4,
    Conflict = 5,
    Server = 6,
    Http = 7,
    Deserialization = 8,
    Serialization = 9,
    InvalidArgument = 10,
    Config = 11,
    Panic = 12,
    NullArg = 13,
}

impl From<&ApiError> for FfiErrorCode {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Connect(_) => FfiErrorCode::Connect,
            ApiError::Validation { .. } => FfiErrorCode::Validation,
            ApiError::Authentication(_) => FfiErrorCode::Authentication,
            ApiError::NotFound(_) => FfiErrorCode::NotFound,
            ApiError::Conflict(_) => FfiErrorCode::Conflict,
            ApiError::Server(_) => FfiErrorCode::Server,
            ApiError::Generic(_) => FfiErrorCode::Http,
            ApiError::Deserialization(_) => FfiErrorCode::Deserialization,
            ApiError::Serialization(_) => FfiErrorCode::Serialization,
            ApiError::InvalidArgument(_) => FfiErrorCode::InvalidArgument,
            ApiError::Config(_) => FfiErrorCode::Config,
        }
    }
}

/// Tag that tells `btcpay_free_result` what `FfiResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    Text = 1,
    LanguageCodeList = 2,
    PermissionList = 3,
    Invoice = 4,
}

#[repr(C)]
pub struct FfiLanguageCode {
    pub code: *mut c_char,
    pub current_language: *mut c_char,
}

#[repr(C)]
pub struct FfiLanguageCodeList {
    pub items: *mut FfiLanguageCode,
    pub len: u32,
}

/// One permission and the permissions it implies.
#[repr(C)]
pub struct FfiPermission {
    pub name: *mut c_char,
    pub included: *mut *mut c_char,
    pub included_len: u32,
}

#[repr(C)]
pub struct FfiPermissionList {
    pub items: *mut FfiPermission,
    pub len: u32,
}

/// An invoice exposed to C. Optional strings are null when absent and
/// optional timestamps are `-1`. `metadata_json` is always a JSON document.
#[repr(C)]
pub struct FfiInvoice {
    pub id: *mut c_char,
    pub store_id: *mut c_char,
    pub amount: *mut c_char,
    pub currency: *mut c_char,
    pub status: *mut c_char,
    pub checkout_link: *mut c_char,
    pub created_time: i64,
    pub expiration_time: i64,
    pub archived: bool,
    pub metadata_json: *mut c_char,
}

/// Result envelope for every request function.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload tagged by `data_tag`.
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, and `data` is null. `http_status` is set for
/// errors raised from a received response; `connect_code` is set for
/// `Connect` errors.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub connect_code: i32,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

/// Hand a string to C. Interior NUL bytes cannot be represented and are
/// removed.
pub(crate) fn into_c_string(s: impl Into<String>) -> *mut c_char {
    let s: String = s.into();
    let bytes: Vec<u8> = s.into_bytes().into_iter().filter(|b| *b != 0).collect();
    CString::new(bytes).unwrap_or_default().into_raw()
}

fn opt_c_string(s: Option<String>) -> *mut c_char {
    s.map_or(std::ptr::null_mut(), into_c_string)
}

fn leak_vec<T>(items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = items.len() as u32;
    let mut boxed = items.into_boxed_slice();
    let ptr = boxed.as_mut_ptr();
    std::mem::forget(boxed);
    (ptr, len)
}

/// Reclaim a vector produced by `leak_vec`.
///
/// # Safety
/// `ptr` and `len` must come from the same `leak_vec` call.
unsafe fn reclaim_vec<T>(ptr: *mut T, len: u32) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    let slice = std::ptr::slice_from_raw_parts_mut(ptr, len as usize);
    unsafe { Box::from_raw(slice) }.into_vec()
}

pub(crate) fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

impl FfiResult {
    fn ok(data_tag: FfiDataTag, data: *mut c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            connect_code: 0,
            data_tag,
            data,
        }))
    }

    fn err(error_code: FfiErrorCode, msg: String, http_status: u16, connect_code: i32) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message: into_c_string(msg),
            http_status,
            connect_code,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    /// Success with no payload (e.g. archive).
    pub(crate) fn ok_empty() -> *mut Self {
        Self::ok(FfiDataTag::None, std::ptr::null_mut())
    }

    pub(crate) fn ok_text(text: String) -> *mut Self {
        Self::ok(FfiDataTag::Text, into_c_string(text) as *mut c_void)
    }

    pub(crate) fn ok_language_codes(list: LanguageCodeList) -> *mut Self {
        let items: Vec<FfiLanguageCode> = list
            .0
            .into_iter()
            .map(|l| FfiLanguageCode {
                code: into_c_string(l.code),
                current_language: into_c_string(l.current_language),
            })
            .collect();
        let (items, len) = leak_vec(items);
        let list = Box::new(FfiLanguageCodeList { items, len });
        Self::ok(FfiDataTag::LanguageCodeList, Box::into_raw(list) as *mut c_void)
    }

    pub(crate) fn ok_permissions(list: PermissionMetadataList) -> *mut Self {
        let items: Vec<FfiPermission> = list
            .0
            .into_iter()
            .map(|p| {
                let (included, included_len) =
                    leak_vec(p.included.into_iter().map(into_c_string).collect());
                FfiPermission {
                    name: into_c_string(p.name),
                    included,
                    included_len,
                }
            })
            .collect();
        let (items, len) = leak_vec(items);
        let list = Box::new(FfiPermissionList { items, len });
        Self::ok(FfiDataTag::PermissionList, Box::into_raw(list) as *mut c_void)
    }

    pub(crate) fn ok_invoice(invoice: InvoiceData) -> *mut Self {
        let ffi = Box::new(FfiInvoice {
            id: into_c_string(invoice.id),
            store_id: into_c_string(invoice.store_id),
            amount: into_c_string(invoice.amount),
            currency: into_c_string(invoice.currency),
            status: into_c_string(invoice.status),
            checkout_link: opt_c_string(invoice.checkout_link),
            created_time: invoice.created_time.unwrap_or(-1),
            expiration_time: invoice.expiration_time.unwrap_or(-1),
            archived: invoice.archived,
            metadata_json: into_c_string(invoice.metadata.to_string()),
        });
        Self::ok(FfiDataTag::Invoice, Box::into_raw(ffi) as *mut c_void)
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let code = FfiErrorCode::from(&err);
        let connect_code = match &err {
            ApiError::Connect(e) => e.code(),
            _ => 0,
        };
        Self::err(code, err.to_string(), err.status().unwrap_or(0), connect_code)
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::err(FfiErrorCode::NullArg, format!("null argument: {name}"), 0, 0)
    }

    pub(crate) fn invalid_argument(msg: String) -> *mut Self {
        Self::err(FfiErrorCode::InvalidArgument, msg, 0, 0)
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::err(FfiErrorCode::Panic, msg.to_string(), 0, 0)
    }

    /// Release a result and everything it owns.
    ///
    /// # Safety
    /// `ptr` must come from one of the constructors above and not have been
    /// released already.
    pub(crate) unsafe fn release(ptr: *mut Self) {
        let result = unsafe { Box::from_raw(ptr) };
        free_c_string(result.error_message);
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::None => {}
            FfiDataTag::Text => free_c_string(result.data as *mut c_char),
            FfiDataTag::LanguageCodeList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiLanguageCodeList) };
                for item in unsafe { reclaim_vec(list.items, list.len) } {
                    free_c_string(item.code);
                    free_c_string(item.current_language);
                }
            }
            FfiDataTag::PermissionList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiPermissionList) };
                for item in unsafe { reclaim_vec(list.items, list.len) } {
                    free_c_string(item.name);
                    for included in unsafe { reclaim_vec(item.included, item.included_len) } {
                        free_c_string(included);
                    }
                }
            }
            FfiDataTag::Invoice => {
                let invoice = unsafe { Box::from_raw(result.data as *mut FfiInvoice) };
                for s in [
                    invoice.id,
                    invoice.store_id,
                    invoice.amount,
                    invoice.currency,
                    invoice.status,
                    invoice.checkout_link,
                    invoice.metadata_json,
                ] {
                    free_c_string(s);
                }
            }
        }
    }
}
