use std::ffi::c_void;
use std::os::raw::{c_char, c_int};
#[cfg(unix)]
use std::path::PathBuf;

#[cfg(unix)]
use imgbridge_peer::{Bridge, HostConfig};

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImgbridgeResult {
    Ok = 0,
    InvalidArgument = 1,
    TransportError = 2,
    WireError = 3,
    SchemaError = 4,
    Disconnected = 5,
    NotConnected = 6,
    ShortBuffer = 7,
    Timeout = 8,
    Internal = 99,
}

pub const IMGBRIDGE_OK: ImgbridgeResult = ImgbridgeResult::Ok;
pub const IMGBRIDGE_ERR_INVALID_ARGUMENT: ImgbridgeResult = ImgbridgeResult::InvalidArgument;
pub const IMGBRIDGE_ERR_TRANSPORT: ImgbridgeResult = ImgbridgeResult::TransportError;
pub const IMGBRIDGE_ERR_WIRE: ImgbridgeResult = ImgbridgeResult::WireError;
pub const IMGBRIDGE_ERR_SCHEMA: ImgbridgeResult = ImgbridgeResult::SchemaError;
pub const IMGBRIDGE_ERR_DISCONNECTED: ImgbridgeResult = ImgbridgeResult::Disconnected;
pub const IMGBRIDGE_ERR_NOT_CONNECTED: ImgbridgeResult = ImgbridgeResult::NotConnected;
pub const IMGBRIDGE_ERR_SHORT_BUFFER: ImgbridgeResult = ImgbridgeResult::ShortBuffer;
pub const IMGBRIDGE_ERR_TIMEOUT: ImgbridgeResult = ImgbridgeResult::Timeout;
pub const IMGBRIDGE_ERR_INTERNAL: ImgbridgeResult = ImgbridgeResult::Internal;

/// Called once per plot request with the requested buffer name.
///
/// The callback may call back into the same host handle, typically to
/// answer with `imgbridge_plot_buffer`. A nonzero return is logged.
pub type ImgbridgePlotCallback = Option<extern "C" fn(name: *const c_char) -> c_int>;

/// Optional host settings. Null fields and a zero timeout keep the defaults.
#[repr(C)]
#[derive(Debug)]
pub struct ImgbridgeHostOptions {
    /// `tcp:HOST:PORT` or a Unix socket path.
    pub endpoint: *const c_char,
    /// Program started as `<program> window --endpoint <endpoint>` by `imgbridge_exec`.
    pub window_program: *const c_char,
    pub accept_timeout_ms: u64,
    /// Fixed port and a long accept timeout.
    pub development: bool,
}

impl Default for ImgbridgeHostOptions {
    fn default() -> Self {
        Self {
            endpoint: std::ptr::null(),
            window_program: std::ptr::null(),
            accept_timeout_ms: 0,
            development: false,
        }
    }
}

/// Metadata and pixels of one buffer, borrowed for the duration of the call.
#[repr(C)]
#[derive(Debug)]
pub struct ImgbridgeBufferMetadata {
    pub variable_name: *const c_char,
    pub display_name: *const c_char,
    pub pixel_layout: *const c_char,
    pub transpose: bool,
    pub width: c_int,
    pub height: c_int,
    pub channels: c_int,
    pub row_stride: c_int,
    /// Element type code (0 uint8, 2 uint16, 3 int16, 4 int32, 5 float32, 6 float64).
    pub buffer_type: c_int,
    pub data: *const u8,
    pub len: usize,
}

/// Symbol names returned by `imgbridge_get_observed_symbols`.
///
/// Release with `imgbridge_symbols_free`.
#[repr(C)]
#[derive(Debug)]
pub struct ImgbridgeSymbolList {
    pub names: *mut *mut c_char,
    pub len: usize,
}

impl Default for ImgbridgeSymbolList {
    fn default() -> Self {
        Self {
            names: std::ptr::null_mut(),
            len: 0,
        }
    }
}

pub type ImgbridgeHostHandle = *mut c_void;

#[cfg(unix)]
pub(crate) struct HostHandle {
    pub(crate) config: HostConfig,
    pub(crate) window_program: Option<PathBuf>,
    pub(crate) plot_callback: ImgbridgePlotCallback,
    pub(crate) bridge: Option<Bridge>,
}
