use std::{ffi::CString, os::raw::c_void};
use windows::Win32::Foundation::HMODULE;

use crate::windows::utils;

pub unsafe fn dlsym(handle: *mut c_void, name: &str) -> usize {
    debug_assert!(!handle.is_null());
    let Ok(name_cstr) = CString::new(name) else {
        return 0;
    };
    utils::get_proc_address(HMODULE(handle as isize), &name_cstr)
}
