//! imgbridge-ffi: C-ABI exports of the host bridge.
//!
//! A debugger extension creates a handle with `imgbridge_initialize`,
//! starts the window with `imgbridge_exec` and then drives the bridge from
//! its own loop: `imgbridge_set_available_symbols`,
//! `imgbridge_get_observed_symbols`, `imgbridge_run_event_loop` (which calls
//! back for each plot request) and `imgbridge_plot_buffer`. Errors are
//! returned as [`ImgbridgeResult`] codes with details in
//! `imgbridge_last_error`.

mod args;
mod error;
#[cfg(unix)]
mod host;
mod symbols;
mod types;

use std::panic::AssertUnwindSafe;

#[cfg(unix)]
pub use host::{
    imgbridge_cleanup, imgbridge_exec, imgbridge_get_observed_symbols, imgbridge_initialize,
    imgbridge_is_window_ready, imgbridge_log_message, imgbridge_plot_buffer,
    imgbridge_run_event_loop, imgbridge_set_available_symbols,
};
pub use symbols::imgbridge_symbols_free;
pub use types::{
    ImgbridgeBufferMetadata, ImgbridgeHostHandle, ImgbridgeHostOptions, ImgbridgePlotCallback,
    ImgbridgeResult, ImgbridgeSymbolList, IMGBRIDGE_ERR_DISCONNECTED, IMGBRIDGE_ERR_INTERNAL,
    IMGBRIDGE_ERR_INVALID_ARGUMENT, IMGBRIDGE_ERR_NOT_CONNECTED, IMGBRIDGE_ERR_SCHEMA,
    IMGBRIDGE_ERR_SHORT_BUFFER, IMGBRIDGE_ERR_TIMEOUT, IMGBRIDGE_ERR_TRANSPORT,
    IMGBRIDGE_ERR_WIRE, IMGBRIDGE_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Message describing the last failed call on this thread, or "".
#[no_mangle]
pub extern "C" fn imgbridge_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}
