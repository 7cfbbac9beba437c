//! C ABI for retrohost
//!
//! Exposes the session operations to a managed-code host (JNI glue, Swift,
//! plain C). Every function takes an explicit session handle created with
//! [`rh_session_new`]; the process-wide runtime is installed once with
//! [`rh_init`].
//!
//! Status-returning functions return [`RH_OK`] (0) on success and a
//! negative code on failure. The message for the most recent failure on the
//! calling thread is available from [`rh_last_error_message`].

pub mod runtime;
pub mod session;

pub use runtime::{rh_init, rh_is_initialized};
pub use session::*;

use libc::{c_char, c_int};
use std::cell::RefCell;
use std::ffi::CString;

pub const RH_OK: c_int = 0;
/// `rh_init` was given a config file but a runtime was already running; the
/// file was not applied
pub const RH_ALREADY_INITIALIZED: c_int = 1;
/// A required pointer argument was null
pub const RH_ERR_NULL_POINTER: c_int = -11;
/// A string argument was not valid UTF-8 or an enum value was out of range
pub const RH_ERR_INVALID_ARGUMENT: c_int = -12;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

pub(crate) fn set_last_error(message: impl Into<String>) {
    let message = message.into();
    tracing::debug!("FFI call failed: {}", message);
    let message = CString::new(message.replace('\0', " ")).ok();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = message);
}

/// Convert a host result into a status code, recording the error message
pub(crate) fn status(result: rh_core::Result<()>) -> c_int {
    match result {
        Ok(()) => RH_OK,
        Err(e) => {
            set_last_error(e.to_string());
            e.code()
        }
    }
}

/// Message for the most recent failure on this thread, or null.
///
/// The pointer stays valid until the next failing call on the same thread.
#[no_mangle]
pub extern "C" fn rh_last_error_message() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(std::ptr::null(), |message| message.as_ptr())
    })
}
