use std::ffi::CStr;
use std::os::raw::c_char;

use crate::error;

/// Convert a required C string argument into UTF-8 `&str`.
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn required_str_arg<'a>(value: *const c_char, name: &str) -> Option<&'a str> {
    if value.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null"));
        return None;
    }

    let as_cstr = {
        // SAFETY: The caller guarantees `value` points to a valid NUL-terminated C string.
        unsafe { CStr::from_ptr(value) }
    };

    match as_cstr.to_str() {
        Ok(v) => Some(v),
        Err(_) => {
            let _ = error::set_invalid_argument(format!("{name} must be valid UTF-8"));
            None
        }
    }
}

/// Like [`required_str_arg`], but null means "not given".
///
/// Returns `Err(())` after recording the error when the string is not UTF-8.
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn optional_str_arg<'a>(
    value: *const c_char,
    name: &str,
) -> Result<Option<&'a str>, ()> {
    if value.is_null() {
        return Ok(None);
    }
    // SAFETY: forwarded caller guarantee.
    match unsafe { required_str_arg(value, name) } {
        Some(v) => Ok(Some(v)),
        None => Err(()),
    }
}

/// Convert an array of C strings into owned names.
///
/// # Safety
/// If `len > 0`, `names` must be non-null and point to `len` valid C string pointers.
pub(crate) unsafe fn str_array_arg(names: *const *const c_char, len: usize) -> Option<Vec<String>> {
    if len == 0 {
        return Some(Vec::new());
    }
    if names.is_null() {
        let _ = error::set_invalid_argument("names cannot be null when len > 0");
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    let pointers = unsafe { std::slice::from_raw_parts(names, len) };
    pointers
        .iter()
        .enumerate()
        .map(|(index, &ptr)| {
            // SAFETY: forwarded caller guarantee for each element.
            unsafe { required_str_arg(ptr, &format!("names[{index}]")) }.map(str::to_string)
        })
        .collect()
}

/// Convert a byte pointer + length into a slice.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and readable for `len` bytes.
pub(crate) unsafe fn bytes_arg<'a>(data: *const u8, len: usize, name: &str) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null when len > 0"));
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;

    #[test]
    fn null_required_string_is_rejected() {
        assert!(unsafe { required_str_arg(std::ptr::null(), "name") }.is_none());
        assert_eq!(unsafe { optional_str_arg(std::ptr::null(), "name") }, Ok(None));
    }

    #[test]
    fn string_array_is_copied_in_order() {
        let owned = [CString::new("a").unwrap(), CString::new("b").unwrap()];
        let pointers: Vec<*const c_char> = owned.iter().map(|s| s.as_ptr()).collect();
        let names = unsafe { str_array_arg(pointers.as_ptr(), pointers.len()) };
        assert_eq!(names, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn null_element_fails_the_whole_array() {
        let a = CString::new("a").unwrap();
        let pointers = [a.as_ptr(), std::ptr::null()];
        assert!(unsafe { str_array_arg(pointers.as_ptr(), 2) }.is_none());
    }

    #[test]
    fn empty_bytes_may_be_null() {
        assert_eq!(unsafe { bytes_arg(std::ptr::null(), 0, "data") }, Some(&[][..]));
        assert!(unsafe { bytes_arg(std::ptr::null(), 4, "data") }.is_none());
    }
}
