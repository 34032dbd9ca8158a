//! FFI bindings for the burpee counter
//!
//! This module provides C-compatible functions for driving a workout session from
//! other languages. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `burpee_free_string`.
//! The host owns the timers: it calls `burpee_session_observe` on every poll and
//! `burpee_session_tick` once per second.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::config::CounterConfig;
use crate::error::CounterError;
use crate::session::{PollOutcome, SessionSnapshot, WorkoutSession};
use crate::types::{PoseFrame, RepetitionEvent};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Serialize a result to a C string, recording the error on failure
fn json_result<T: Serialize>(result: Result<T, CounterError>) -> *mut c_char {
    match result.and_then(|value| Ok(serde_json::to_string(&value)?)) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

fn unix_ms_to_utc(unix_ms: i64) -> Result<DateTime<Utc>, CounterError> {
    Utc.timestamp_millis_opt(unix_ms)
        .single()
        .ok_or_else(|| CounterError::ParseError(format!("timestamp out of range: {unix_ms}")))
}

/// Result of observing one frame
#[derive(Serialize)]
struct ObserveResult {
    observed: bool,
    repetition: Option<RepetitionEvent>,
    snapshot: SessionSnapshot,
}

// ============================================================================
// Session API
// ============================================================================

/// Opaque handle to a WorkoutSession
pub struct BurpeeSessionHandle {
    session: WorkoutSession,
}

/// Create a new session from a JSON config. NULL config uses the defaults.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `burpee_session_free`.
/// - Returns NULL on error; call `burpee_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn burpee_session_new(config_json: *const c_char) -> *mut BurpeeSessionHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        Ok(CounterConfig::default())
    } else {
        match cstr_to_string(config_json) {
            Some(s) => CounterConfig::from_json(&s),
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        }
    };

    match config.and_then(WorkoutSession::try_new) {
        Ok(session) => Box::into_raw(Box::new(BurpeeSessionHandle { session })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Mark the pose source ready at `unix_ms`, starting the countdown.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `burpee_session_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn burpee_session_begin(handle: *mut BurpeeSessionHandle, unix_ms: i64) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }
    let handle = &mut *handle;

    match unix_ms_to_utc(unix_ms) {
        Ok(at) => {
            handle.session.begin(at);
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Observe one pose frame (JSON) and return the observation result as JSON.
///
/// Frames that are not ready or lack a nose are skipped, not errors: the result
/// has `"observed": false`.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `burpee_session_new`.
/// - `frame_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `burpee_free_string`.
/// - Returns NULL on error; call `burpee_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn burpee_session_observe(
    handle: *mut BurpeeSessionHandle,
    frame_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }
    let handle = &mut *handle;

    let frame_str = match cstr_to_string(frame_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frame string pointer");
            return ptr::null_mut();
        }
    };

    let result = serde_json::from_str::<PoseFrame>(&frame_str)
        .map_err(CounterError::from)
        .and_then(|frame| match handle.session.observe_frame(&frame) {
            PollOutcome::Stopped => Err(CounterError::SessionStopped),
            PollOutcome::Observed { repetition, .. } => Ok(ObserveResult {
                observed: true,
                repetition,
                snapshot: handle.session.snapshot(),
            }),
            _ => Ok(ObserveResult {
                observed: false,
                repetition: None,
                snapshot: handle.session.snapshot(),
            }),
        });

    json_result(result)
}

/// Fire the one-second trigger at `unix_ms` and return the snapshot as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `burpee_session_new`.
/// - Returns a newly allocated string that must be freed with `burpee_free_string`.
/// - Returns NULL on error; call `burpee_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn burpee_session_tick(
    handle: *mut BurpeeSessionHandle,
    unix_ms: i64,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }
    let handle = &mut *handle;

    json_result(unix_ms_to_utc(unix_ms).map(|at| {
        handle.session.tick_second(at);
        handle.session.snapshot()
    }))
}

/// Current snapshot as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `burpee_session_new`.
/// - Returns a newly allocated string that must be freed with `burpee_free_string`.
#[no_mangle]
pub unsafe extern "C" fn burpee_session_snapshot(handle: *const BurpeeSessionHandle) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }
    let handle = &*handle;

    json_result(Ok(handle.session.snapshot()))
}

/// Stop the session at `unix_ms` and return the workout summary as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `burpee_session_new`.
/// - Returns a newly allocated string that must be freed with `burpee_free_string`.
/// - Returns NULL on error; call `burpee_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn burpee_session_stop(
    handle: *mut BurpeeSessionHandle,
    unix_ms: i64,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }
    let handle = &mut *handle;

    json_result(unix_ms_to_utc(unix_ms).map(|at| {
        handle.session.stop(at);
        handle.session.summary()
    }))
}

/// Free a session.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `burpee_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn burpee_session_free(handle: *mut BurpeeSessionHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by burpee functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a burpee function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn burpee_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next burpee function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn burpee_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn burpee_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
