use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use imgbridge_peer::PeerError;

use crate::types::ImgbridgeResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let sanitized = message.into().replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> ImgbridgeResult {
    set_error_message(message);
    ImgbridgeResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_peer_error(err: &PeerError) -> ImgbridgeResult {
    set_error_message(err.to_string());
    match err {
        PeerError::Transport(_) => ImgbridgeResult::TransportError,
        PeerError::Wire(_) => ImgbridgeResult::WireError,
        PeerError::Schema(_) => ImgbridgeResult::SchemaError,
        PeerError::Disconnected(_) => ImgbridgeResult::Disconnected,
        PeerError::NotConnected => ImgbridgeResult::NotConnected,
        PeerError::ShortBuffer { .. } => ImgbridgeResult::ShortBuffer,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    fn last_error() -> String {
        // SAFETY: the pointer refers to this thread's error string, which is not replaced here.
        unsafe { CStr::from_ptr(last_error_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn interior_nul_is_replaced() {
        set_error_message("bad\0name");
        assert_eq!(last_error(), "bad?name");
        clear_error_state();
        assert_eq!(last_error(), "");
    }

    #[test]
    fn peer_errors_map_to_codes() {
        let short = PeerError::ShortBuffer {
            name: "img".to_string(),
            expected: 16,
            actual: 4,
        };
        assert_eq!(map_peer_error(&short), ImgbridgeResult::ShortBuffer);
        assert!(last_error().contains("img"));

        let schema = PeerError::from(imgbridge_schema::SchemaError::UnknownBufferType(9));
        assert_eq!(map_peer_error(&schema), ImgbridgeResult::SchemaError);
        assert_eq!(
            map_peer_error(&PeerError::Disconnected("eof".to_string())),
            ImgbridgeResult::Disconnected
        );
    }
}
