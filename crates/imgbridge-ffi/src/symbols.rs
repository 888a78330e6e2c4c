use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use crate::types::ImgbridgeSymbolList;

/// Replace the contents of `list` with `names`, releasing what it held.
///
/// # Safety
/// `list.names` must be null or an array produced by this function.
pub(crate) unsafe fn write_symbols_out(list: &mut ImgbridgeSymbolList, names: Vec<String>) {
    // SAFETY: Forwarded caller guarantee.
    unsafe { release(list) };

    let owned: Box<[*mut c_char]> = names
        .into_iter()
        .map(|name| {
            CString::new(name.replace('\0', "?"))
                .unwrap_or_default()
                .into_raw()
        })
        .collect();
    let len = owned.len();
    list.names = if len == 0 {
        ptr::null_mut()
    } else {
        Box::into_raw(owned) as *mut *mut c_char
    };
    list.len = len;
}

unsafe fn release(list: &mut ImgbridgeSymbolList) {
    if list.names.is_null() {
        *list = ImgbridgeSymbolList::default();
        return;
    }

    let array_ptr = ptr::slice_from_raw_parts_mut(list.names, list.len);
    // SAFETY: The array and its strings were allocated by `write_symbols_out`.
    let array = unsafe { Box::from_raw(array_ptr) };
    for &name in array.iter() {
        if !name.is_null() {
            // SAFETY: Each entry came from `CString::into_raw`.
            drop(unsafe { CString::from_raw(name) });
        }
    }
    *list = ImgbridgeSymbolList::default();
}

/// Free the names held by a list filled by `imgbridge_get_observed_symbols`.
///
/// # Safety
/// `list` must be null or a valid pointer to a list that is zeroed or was
/// filled by this library.
#[no_mangle]
pub unsafe extern "C" fn imgbridge_symbols_free(list: *mut ImgbridgeSymbolList) {
    crate::ffi_boundary((), || {
        if list.is_null() {
            return;
        }
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { release(&mut *list) };
    });
}
