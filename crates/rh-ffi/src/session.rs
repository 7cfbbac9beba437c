//! Session entry points
//!
//! A handle pairs the session (locked for lifecycle and stepping calls) with
//! its input router, which input callbacks reach without taking the session
//! lock, so touch and key events never wait for a frame to finish.

use crate::runtime::runtime;
use crate::{set_last_error, status, RH_ERR_INVALID_ARGUMENT, RH_ERR_NULL_POINTER, RH_OK};
use libc::{c_char, c_float, c_int, size_t};
use parking_lot::Mutex;
use rh_core::config::ShaderSelection;
use rh_core::{HostError, VideoError};
use rh_input::InputRouter;
use rh_integration::{CreateParams, Session, StepOutcome};
use std::ffi::CStr;
use std::path::PathBuf;
use std::sync::Arc;

/// Opaque session handle
pub struct RhSession {
    session: Mutex<Session>,
    input: Arc<InputRouter>,
}

/// `rh_step` result: the core ran one frame
pub const RH_STEP_ADVANCED: c_int = 1;
/// `rh_step` result: the session is not running
pub const RH_STEP_IDLE: c_int = 0;

macro_rules! handle {
    ($ptr:expr) => {
        match $ptr.as_ref() {
            Some(handle) => handle,
            None => {
                set_last_error("null session handle");
                return RH_ERR_NULL_POINTER;
            }
        }
    };
}

unsafe fn path_arg(ptr: *const c_char, name: &str) -> Result<PathBuf, c_int> {
    if ptr.is_null() {
        set_last_error(format!("{} is null", name));
        return Err(RH_ERR_NULL_POINTER);
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Ok(PathBuf::from(s)),
        Err(_) => {
            set_last_error(format!("{} is not valid UTF-8", name));
            Err(RH_ERR_INVALID_ARGUMENT)
        }
    }
}

/// Allocate a session in the `Uninitialized` state.
///
/// Installs a default runtime if `rh_init` was not called. Free with
/// [`rh_session_free`].
#[no_mangle]
pub extern "C" fn rh_session_new() -> *mut RhSession {
    let session = runtime().new_session();
    let input = session.input();
    Box::into_raw(Box::new(RhSession {
        session: Mutex::new(session),
        input,
    }))
}

/// Destroy (if needed) and free a session.
///
/// # Safety
///
/// `handle` must be null or a pointer returned by [`rh_session_new`] that
/// has not been freed. No other call may use it concurrently or afterwards.
#[no_mangle]
pub unsafe extern "C" fn rh_session_free(handle: *mut RhSession) {
    if handle.is_null() {
        return;
    }
    drop(Box::from_raw(handle));
}

/// Load a core and its content.
///
/// `shader` is 0 (default), 1 (CRT), 2 (LCD) or 3 (sharp).
///
/// # Safety
///
/// `handle` must be a live session handle; the path arguments must be
/// NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn rh_create(
    handle: *const RhSession,
    core_path: *const c_char,
    game_path: *const c_char,
    system_dir: *const c_char,
    saves_dir: *const c_char,
    shader: c_int,
) -> c_int {
    let handle = handle!(handle);

    let paths = (|| {
        Ok::<_, c_int>((
            path_arg(core_path, "core path")?,
            path_arg(game_path, "game path")?,
            path_arg(system_dir, "system directory")?,
            path_arg(saves_dir, "saves directory")?,
        ))
    })();
    let (core_path, game_path, system_dir, saves_dir) = match paths {
        Ok(paths) => paths,
        Err(code) => return code,
    };

    let Some(shader) = ShaderSelection::from_raw(shader) else {
        return status(Err(HostError::Video(VideoError::UnknownShader(shader))));
    };

    let params = CreateParams::new(core_path, game_path, system_dir, saves_dir).with_shader(shader);
    status(handle.session.lock().create(params))
}

/// # Safety
///
/// `handle` must be a live session handle.
#[no_mangle]
pub unsafe extern "C" fn rh_resume(handle: *const RhSession) -> c_int {
    status(handle!(handle).session.lock().resume())
}

/// # Safety
///
/// `handle` must be a live session handle.
#[no_mangle]
pub unsafe extern "C" fn rh_pause(handle: *const RhSession) -> c_int {
    status(handle!(handle).session.lock().pause())
}

/// # Safety
///
/// `handle` must be a live session handle.
#[no_mangle]
pub unsafe extern "C" fn rh_on_surface_created(handle: *const RhSession) -> c_int {
    status(handle!(handle).session.lock().on_surface_created())
}

/// # Safety
///
/// `handle` must be a live session handle.
#[no_mangle]
pub unsafe extern "C" fn rh_on_surface_changed(
    handle: *const RhSession,
    width: c_int,
    height: c_int,
) -> c_int {
    status(handle!(handle).session.lock().on_surface_changed(width, height))
}

/// # Safety
///
/// `handle` must be a live session handle.
#[no_mangle]
pub unsafe extern "C" fn rh_on_surface_destroyed(handle: *const RhSession) -> c_int {
    status(handle!(handle).session.lock().on_surface_destroyed())
}

/// Run one frame. Returns [`RH_STEP_ADVANCED`], [`RH_STEP_IDLE`] or a
/// negative error code.
///
/// # Safety
///
/// `handle` must be a live session handle.
#[no_mangle]
pub unsafe extern "C" fn rh_step(handle: *const RhSession) -> c_int {
    match handle!(handle).session.lock().step() {
        Ok(StepOutcome::Advanced { .. }) => RH_STEP_ADVANCED,
        Ok(StepOutcome::Idle) => RH_STEP_IDLE,
        Err(e) => {
            set_last_error(e.to_string());
            e.code()
        }
    }
}

/// # Safety
///
/// `handle` must be a live session handle.
#[no_mangle]
pub unsafe extern "C" fn rh_reset(handle: *const RhSession) -> c_int {
    status(handle!(handle).session.lock().reset())
}

/// Release the core and its resources. The handle itself stays allocated
/// until [`rh_session_free`].
///
/// # Safety
///
/// `handle` must be a live session handle.
#[no_mangle]
pub unsafe extern "C" fn rh_destroy(handle: *const RhSession) -> c_int {
    status(handle!(handle).session.lock().destroy())
}

/// Snapshot the core state into a newly allocated buffer.
///
/// Returns null on failure. Release the buffer with [`rh_buffer_free`].
///
/// # Safety
///
/// `handle` must be a live session handle and `out_len` a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn rh_serialize(handle: *const RhSession, out_len: *mut size_t) -> *mut u8 {
    let (Some(handle), Some(out_len)) = (handle.as_ref(), out_len.as_mut()) else {
        set_last_error("null argument to rh_serialize");
        return std::ptr::null_mut();
    };
    *out_len = 0;

    match handle.session.lock().serialize() {
        Ok(state) => {
            let state = state.into_boxed_slice();
            *out_len = state.len();
            Box::into_raw(state).cast::<u8>()
        }
        Err(e) => {
            set_last_error(e.to_string());
            std::ptr::null_mut()
        }
    }
}

/// Free a buffer returned by [`rh_serialize`].
///
/// # Safety
///
/// `data` and `len` must come from one successful `rh_serialize` call and
/// the buffer must not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn rh_buffer_free(data: *mut u8, len: size_t) {
    if data.is_null() {
        return;
    }
    drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(data, len)));
}

/// Restore a snapshot. Returns false, leaving the session untouched, when
/// the buffer is rejected.
///
/// # Safety
///
/// `handle` must be a live session handle; `data` must point to `len`
/// readable bytes (or be null with `len` 0).
#[no_mangle]
pub unsafe extern "C" fn rh_unserialize(handle: *const RhSession, data: *const u8, len: size_t) -> bool {
    let Some(handle) = handle.as_ref() else {
        set_last_error("null session handle");
        return false;
    };
    let data: &[u8] = if data.is_null() {
        if len != 0 {
            set_last_error("null state buffer");
            return false;
        }
        &[]
    } else {
        std::slice::from_raw_parts(data, len)
    };

    match handle.session.lock().unserialize(data) {
        Ok(()) => true,
        Err(e) => {
            set_last_error(e.to_string());
            false
        }
    }
}

/// Route an axis pair. `source`: 0 d-pad, 1 left stick, 2 right stick,
/// 3 pointer. Axes are clamped to [-1, 1].
///
/// # Safety
///
/// `handle` must be a live session handle.
#[no_mangle]
pub unsafe extern "C" fn rh_on_motion_event(
    handle: *const RhSession,
    port: c_int,
    source: c_int,
    x: c_float,
    y: c_float,
) -> c_int {
    status(handle!(handle).input.on_motion_event_raw(port, source, x, y))
}

/// Route a key event. `action`: 0 press, 1 release.
///
/// # Safety
///
/// `handle` must be a live session handle.
#[no_mangle]
pub unsafe extern "C" fn rh_on_key_event(
    handle: *const RhSession,
    port: c_int,
    action: c_int,
    key_code: c_int,
) -> c_int {
    status(
        handle!(handle)
            .input
            .on_key_event_raw(port, action, key_code)
            .map(|_| ()),
    )
}

/// Frames the core has advanced since `rh_create`, or 0 for a null handle.
///
/// # Safety
///
/// `handle` must be null or a live session handle.
#[no_mangle]
pub unsafe extern "C" fn rh_frame_count(handle: *const RhSession) -> u64 {
    handle
        .as_ref()
        .map_or(0, |handle| handle.session.lock().frame_count())
}

/// Display aspect ratio of the loaded content, or 0 when none is loaded.
///
/// # Safety
///
/// `handle` must be null or a live session handle.
#[no_mangle]
pub unsafe extern "C" fn rh_aspect_ratio(handle: *const RhSession) -> c_float {
    let Some(handle) = handle.as_ref() else {
        return 0.0;
    };
    handle.session.lock().aspect_ratio().unwrap_or(0.0)
}
