use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use imgbridge_peer::{Bridge, HostConfig, PeerError};
use imgbridge_schema::{BufferDescriptor, BufferType};
use imgbridge_transport::Endpoint;
use tracing::warn;

use crate::args;
use crate::error;
use crate::types::{
    HostHandle, ImgbridgeBufferMetadata, ImgbridgeHostHandle, ImgbridgeHostOptions,
    ImgbridgePlotCallback, ImgbridgeResult, ImgbridgeSymbolList,
};

fn with_host_mut<T>(
    handle: ImgbridgeHostHandle,
    on_error: T,
    f: impl FnOnce(&mut HostHandle) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("host handle cannot be null");
        return on_error;
    }

    let host = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *(handle as *mut HostHandle) }
    };

    f(host)
}

fn host_config(options: &ImgbridgeHostOptions) -> Option<HostConfig> {
    let mut config = if options.development {
        HostConfig::development()
    } else {
        HostConfig::default()
    };

    // SAFETY: The caller guarantees option strings are null or valid C strings.
    let endpoint = unsafe { args::optional_str_arg(options.endpoint, "endpoint") }.ok()?;
    if let Some(text) = endpoint {
        match text.parse::<Endpoint>() {
            Ok(endpoint) => config.endpoint = endpoint,
            Err(err) => {
                let _ = error::set_invalid_argument(err.to_string());
                return None;
            }
        }
    }
    if options.accept_timeout_ms > 0 {
        config.accept_timeout = Duration::from_millis(options.accept_timeout_ms);
    }
    Some(config)
}

/// Create a host handle. Nothing is bound until `imgbridge_exec`.
///
/// `plot_callback` is invoked by `imgbridge_run_event_loop` for every plot
/// request. Returns null on invalid options.
///
/// # Safety
/// `options` must be null or point to a valid `ImgbridgeHostOptions` whose
/// string fields are null or valid NUL-terminated C strings.
#[no_mangle]
pub unsafe extern "C" fn imgbridge_initialize(
    plot_callback: ImgbridgePlotCallback,
    options: *const ImgbridgeHostOptions,
) -> ImgbridgeHostHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        let defaults = ImgbridgeHostOptions::default();
        let options = if options.is_null() {
            &defaults
        } else {
            // SAFETY: Pointer validity is guaranteed by the caller.
            unsafe { &*options }
        };

        let Some(config) = host_config(options) else {
            return std::ptr::null_mut();
        };
        // SAFETY: Validated like the endpoint above.
        let window_program = match unsafe {
            args::optional_str_arg(options.window_program, "window_program")
        } {
            Ok(program) => program.map(PathBuf::from),
            Err(()) => return std::ptr::null_mut(),
        };

        let handle = HostHandle {
            config,
            window_program,
            plot_callback,
            bridge: None,
        };
        Box::into_raw(Box::new(handle)) as ImgbridgeHostHandle
    })
}

/// Listen, start the window program if one was configured and wait for it.
///
/// Returns `IMGBRIDGE_ERR_TIMEOUT` when no window connected in time; the
/// handle stays usable and every later call is a no-op.
///
/// # Safety
/// `host` must be a valid handle returned by `imgbridge_initialize`.
#[no_mangle]
pub unsafe extern "C" fn imgbridge_exec(host: ImgbridgeHostHandle) -> ImgbridgeResult {
    crate::ffi_boundary(ImgbridgeResult::Internal, || {
        error::clear_error_state();

        with_host_mut(host, ImgbridgeResult::InvalidArgument, |host| {
            if host.bridge.is_none() {
                match Bridge::bind(host.config.clone()) {
                    Ok(bridge) => host.bridge = Some(bridge),
                    Err(err) => return error::map_peer_error(&err),
                }
            }
            let Some(bridge) = host.bridge.as_mut() else {
                return ImgbridgeResult::Internal;
            };

            if let Some(program) = &host.window_program {
                let spawned = Command::new(program)
                    .arg("window")
                    .arg("--endpoint")
                    .arg(bridge.endpoint().to_string())
                    .spawn();
                match spawned {
                    Ok(child) => bridge.attach_process(child),
                    Err(err) => {
                        return error::set_invalid_argument(format!(
                            "failed to start {}: {err}",
                            program.display()
                        ))
                    }
                }
            }

            match bridge.wait_for_window() {
                Ok(true) => ImgbridgeResult::Ok,
                Ok(false) => {
                    error::set_error_message(format!(
                        "no window connected within {:?}",
                        host.config.accept_timeout
                    ));
                    ImgbridgeResult::Timeout
                }
                Err(err) => error::map_peer_error(&err),
            }
        })
    })
}

/// Return 1 while a window is connected and its process, if any, runs.
///
/// # Safety
/// `host` must be null or a valid handle returned by `imgbridge_initialize`.
#[no_mangle]
pub unsafe extern "C" fn imgbridge_is_window_ready(host: ImgbridgeHostHandle) -> c_int {
    crate::ffi_boundary(0, || {
        with_host_mut(host, 0, |host| {
            c_int::from(host.bridge.as_mut().is_some_and(Bridge::is_window_ready))
        })
    })
}

/// Ask the window which symbols it shows, selected one first.
///
/// Any names already held by `out` are released first. The list is empty
/// when no window answered.
///
/// # Safety
/// `host` must be a valid handle and `out` a valid writable pointer whose
/// contents are zeroed or were produced by this library.
#[no_mangle]
pub unsafe extern "C" fn imgbridge_get_observed_symbols(
    host: ImgbridgeHostHandle,
    out: *mut ImgbridgeSymbolList,
) -> ImgbridgeResult {
    crate::ffi_boundary(ImgbridgeResult::Internal, || {
        error::clear_error_state();

        if out.is_null() {
            return error::set_invalid_argument("out cannot be null");
        }

        with_host_mut(host, ImgbridgeResult::InvalidArgument, |host| {
            let names = match host.bridge.as_mut() {
                Some(bridge) => match bridge.observed_symbols() {
                    Ok(names) => names,
                    Err(err) => return error::map_peer_error(&err),
                },
                None => Vec::new(),
            };
            // SAFETY: Pointer was checked for null above.
            unsafe { crate::symbols::write_symbols_out(&mut *out, names) };
            ImgbridgeResult::Ok
        })
    })
}

/// Publish the symbols that can currently be plotted.
///
/// # Safety
/// `host` must be a valid handle. If `len > 0`, `names` must point to `len`
/// valid NUL-terminated C strings.
#[no_mangle]
pub unsafe extern "C" fn imgbridge_set_available_symbols(
    host: ImgbridgeHostHandle,
    names: *const *const c_char,
    len: usize,
) -> ImgbridgeResult {
    crate::ffi_boundary(ImgbridgeResult::Internal, || {
        error::clear_error_state();

        let names = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::str_array_arg(names, len) } {
                Some(v) => v,
                None => return ImgbridgeResult::InvalidArgument,
            }
        };

        with_host_mut(host, ImgbridgeResult::InvalidArgument, |host| {
            match host.bridge.as_mut() {
                Some(bridge) => match bridge.set_available_symbols(names.as_slice()) {
                    Ok(()) => ImgbridgeResult::Ok,
                    Err(err) => error::map_peer_error(&err),
                },
                None => ImgbridgeResult::Ok,
            }
        })
    })
}

/// Read pending input and invoke the plot callback for each plot request.
///
/// The callback runs after the handle has been released, so it may call
/// `imgbridge_plot_buffer` on the same handle.
///
/// # Safety
/// `host` must be a valid handle returned by `imgbridge_initialize`.
#[no_mangle]
pub unsafe extern "C" fn imgbridge_run_event_loop(host: ImgbridgeHostHandle) -> ImgbridgeResult {
    crate::ffi_boundary(ImgbridgeResult::Internal, || {
        error::clear_error_state();

        let collected = with_host_mut(host, Err(ImgbridgeResult::InvalidArgument), |host| {
            let mut requested = Vec::new();
            if let Some(bridge) = host.bridge.as_mut() {
                bridge
                    .run_event_loop(|name| requested.push(name.to_string()))
                    .map_err(|err| error::map_peer_error(&err))?;
            }
            Ok((host.plot_callback, requested))
        });
        let (callback, requested) = match collected {
            Ok(v) => v,
            Err(code) => return code,
        };

        let Some(callback) = callback else {
            if !requested.is_empty() {
                warn!(count = requested.len(), "plot requests dropped: no callback set");
            }
            return ImgbridgeResult::Ok;
        };
        for name in requested {
            let Ok(c_name) = CString::new(name.as_str()) else {
                warn!(%name, "skipping plot request with embedded NUL");
                continue;
            };
            let rc = callback(c_name.as_ptr());
            if rc != 0 {
                warn!(%name, rc, "plot callback reported failure");
            }
        }
        ImgbridgeResult::Ok
    })
}

/// Send one buffer to the window.
///
/// `metadata->data` must hold at least `row_stride * height * channels`
/// elements of the given type.
///
/// # Safety
/// `host` must be a valid handle and `metadata` a valid pointer whose
/// strings are valid C strings and whose `data` is readable for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn imgbridge_plot_buffer(
    host: ImgbridgeHostHandle,
    metadata: *const ImgbridgeBufferMetadata,
) -> ImgbridgeResult {
    crate::ffi_boundary(ImgbridgeResult::Internal, || {
        error::clear_error_state();

        if metadata.is_null() {
            return error::set_invalid_argument("metadata cannot be null");
        }
        let metadata = {
            // SAFETY: Pointer was checked for null above.
            unsafe { &*metadata }
        };
        if metadata.data.is_null() {
            return error::set_invalid_argument("data cannot be null");
        }

        // SAFETY: The caller guarantees the strings and data range are valid.
        let (name, display_name, pixel_layout, pixels) = unsafe {
            (
                args::required_str_arg(metadata.variable_name, "variable_name"),
                args::required_str_arg(metadata.display_name, "display_name"),
                args::required_str_arg(metadata.pixel_layout, "pixel_layout"),
                args::bytes_arg(metadata.data, metadata.len, "data"),
            )
        };
        let (Some(name), Some(display_name), Some(pixel_layout), Some(pixels)) =
            (name, display_name, pixel_layout, pixels)
        else {
            return ImgbridgeResult::InvalidArgument;
        };

        let buffer_type = match BufferType::try_from(metadata.buffer_type) {
            Ok(ty) => ty,
            Err(err) => return error::map_peer_error(&PeerError::from(err)),
        };
        let descriptor = BufferDescriptor {
            name: name.to_string(),
            display_name: display_name.to_string(),
            pixel_layout: pixel_layout.to_string(),
            transpose: metadata.transpose,
            width: metadata.width,
            height: metadata.height,
            channels: metadata.channels,
            stride: metadata.row_stride,
            buffer_type,
        };

        with_host_mut(host, ImgbridgeResult::InvalidArgument, |host| {
            match host.bridge.as_mut() {
                Some(bridge) => match bridge.plot_buffer(&descriptor, pixels) {
                    Ok(()) => ImgbridgeResult::Ok,
                    Err(err) => error::map_peer_error(&err),
                },
                None => ImgbridgeResult::Ok,
            }
        })
    })
}

/// Forward a log line at `level` (`trace`, `debug`, `info`, `warning`,
/// `error`, `critical`). Null or unknown levels log at info.
///
/// # Safety
/// `host` must be a valid handle, `level` null or a valid C string and
/// `message` a valid C string.
#[no_mangle]
pub unsafe extern "C" fn imgbridge_log_message(
    host: ImgbridgeHostHandle,
    level: *const c_char,
    message: *const c_char,
) -> ImgbridgeResult {
    crate::ffi_boundary(ImgbridgeResult::Internal, || {
        error::clear_error_state();

        with_host_mut(host, ImgbridgeResult::InvalidArgument, |_| {
            // SAFETY: We validate null and UTF-8 in helpers.
            let (level, message) = unsafe {
                (
                    args::optional_str_arg(level, "level"),
                    args::required_str_arg(message, "message"),
                )
            };
            let (Ok(level), Some(message)) = (level, message) else {
                return ImgbridgeResult::InvalidArgument;
            };
            Bridge::log_message(level.unwrap_or("info"), message);
            ImgbridgeResult::Ok
        })
    })
}

/// Stop the bridge, kill a spawned window process and free the handle.
///
/// # Safety
/// `host` must be null or a handle returned by `imgbridge_initialize`.
#[no_mangle]
pub unsafe extern "C" fn imgbridge_cleanup(host: ImgbridgeHostHandle) {
    crate::ffi_boundary((), || {
        if host.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by imgbridge_initialize.
        unsafe {
            drop(Box::from_raw(host as *mut HostHandle));
        }
    });
}
