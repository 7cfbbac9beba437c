//! Process-wide runtime for the C ABI
//!
//! Installed once by `rh_init` and kept until the process exits.

use crate::{set_last_error, RH_ALREADY_INITIALIZED, RH_ERR_INVALID_ARGUMENT, RH_OK};
use libc::{c_char, c_int};
use once_cell::sync::OnceCell;
use rh_core::{logging, Config};
use rh_integration::Runtime;
use std::ffi::CStr;
use std::path::Path;
use std::sync::Arc;

static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

/// Runtime, installing one with default configuration if `rh_init` was never called
pub(crate) fn runtime() -> Arc<Runtime> {
    Arc::clone(RUNTIME.get_or_init(|| install(Config::default())))
}

fn install(config: Config) -> Arc<Runtime> {
    logging::init(config.debug.log_level);
    Runtime::new(config)
}

/// Initialize the runtime.
///
/// `config_path` names a TOML configuration file; pass null for defaults.
/// Once a runtime exists (including the default one installed by
/// `rh_session_new`) nothing changes: a null path returns [`RH_OK`] and a
/// config file returns [`RH_ALREADY_INITIALIZED`] without being read.
///
/// # Safety
///
/// `config_path` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn rh_init(config_path: *const c_char) -> c_int {
    if RUNTIME.get().is_some() {
        return already_initialized(config_path);
    }

    let config = if config_path.is_null() {
        Config::default()
    } else {
        let Ok(path) = CStr::from_ptr(config_path).to_str() else {
            set_last_error("config path is not valid UTF-8");
            return RH_ERR_INVALID_ARGUMENT;
        };
        match Config::load_from(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(e.to_string());
                return e.code();
            }
        }
    };

    if RUNTIME.set(install(config)).is_err() {
        return already_initialized(config_path);
    }
    tracing::info!("retrohost runtime initialized");
    RH_OK
}

fn already_initialized(config_path: *const c_char) -> c_int {
    if config_path.is_null() {
        tracing::debug!("rh_init: runtime already initialized");
        return RH_OK;
    }
    tracing::warn!("rh_init: runtime already initialized, config file not applied");
    set_last_error("runtime already initialized; config file not applied");
    RH_ALREADY_INITIALIZED
}

/// Whether a runtime has been installed
#[no_mangle]
pub extern "C" fn rh_is_initialized() -> bool {
    RUNTIME.get().is_some()
}
