use std::sync::Mutex;

use fnv::FnvHashMap;

use crate::core::{inline_hook::InlineHook, interceptor::HookBackend, Error};

/// Inline hooks written by this crate, keyed by target address.
#[derive(Default)]
pub struct NativeBackend {
    hooks: Mutex<FnvHashMap<usize, InlineHook>>
}

impl HookBackend for NativeBackend {
    unsafe fn hook(&self, orig_addr: usize, hook_addr: usize) -> Result<usize, Error> {
        let mut hooks = self.hooks.lock().unwrap();
        if hooks.contains_key(&orig_addr) {
            return Err(Error::AlreadyHooked(orig_addr));
        }

        let hook = InlineHook::install(orig_addr, hook_addr)?;
        let trampoline_addr = hook.trampoline_addr();
        hooks.insert(orig_addr, hook);
        Ok(trampoline_addr)
    }

    unsafe fn unhook(&self, orig_addr: usize) -> Result<(), Error> {
        let Some(hook) = self.hooks.lock().unwrap().remove(&orig_addr) else {
            return Err(Error::HookingError(format!("{:#x} is not hooked", orig_addr)));
        };
        hook.remove()
    }
}
