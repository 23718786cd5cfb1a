use std::os::raw::c_void;

use minhook::MinHook;

use crate::core::{interceptor::HookBackend, Error};

/// Inline hooks through MinHook, which also handles suspending threads while patching.
#[derive(Default)]
pub struct NativeBackend;

impl HookBackend for NativeBackend {
    unsafe fn hook(&self, orig_addr: usize, hook_addr: usize) -> Result<usize, Error> {
        let trampoline_addr = MinHook::create_hook(orig_addr as *mut c_void, hook_addr as *mut c_void)? as usize;
        if let Err(e) = MinHook::enable_hook(orig_addr as *mut c_void) {
            MinHook::remove_hook(orig_addr as *mut c_void).ok();
            return Err(e.into());
        }
        Ok(trampoline_addr)
    }

    unsafe fn unhook(&self, orig_addr: usize) -> Result<(), Error> {
        MinHook::disable_hook(orig_addr as *mut c_void)?;
        MinHook::remove_hook(orig_addr as *mut c_void)?;
        Ok(())
    }
}

impl From<minhook::MH_STATUS> for Error {
    fn from(e: minhook::MH_STATUS) -> Self {
        Error::HookingError(format!("MinHook returned status: {:?}", e))
    }
}
