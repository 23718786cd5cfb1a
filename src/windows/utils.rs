use std::{ffi::CStr, path::PathBuf};

use widestring::Utf16Str;
use windows::{
    core::{PCSTR, PCWSTR},
    Win32::{
        Foundation::{HMODULE, MAX_PATH},
        System::LibraryLoader::{GetModuleFileNameW, GetModuleHandleW, GetProcAddress}
    }
};

pub fn get_proc_address(hmodule: HMODULE, name: &CStr) -> usize {
    let res = unsafe { GetProcAddress(hmodule, PCSTR(name.as_ptr() as *const u8)) };
    if let Some(proc) = res {
        proc as usize
    }
    else {
        0
    }
}

pub fn get_exec_path() -> PathBuf {
    let mut slice = [0u16; MAX_PATH as usize];
    let length = unsafe { GetModuleFileNameW(HMODULE::default(), &mut slice) } as usize;
    let exec_path_str = unsafe { Utf16Str::from_slice_unchecked(&slice[..length]) }.to_string();
    PathBuf::from(exec_path_str)
}

/// Handle of an already loaded module, or 0.
pub fn get_module_handle(name: PCWSTR) -> usize {
    match unsafe { GetModuleHandleW(name) } {
        Ok(handle) => handle.0 as usize,
        Err(_) => 0
    }
}
