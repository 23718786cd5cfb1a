use std::{collections::hash_map, sync::Mutex};

use fnv::FnvHashMap;

use crate::interceptor_impl;

use super::Error;

/// Platform primitive that redirects a function and hands back a callable trampoline.
pub trait HookBackend: Send + Sync {
    /// # Safety
    /// `orig_addr` must be the entry of a function and `hook_addr` a function with a
    /// compatible signature and calling convention.
    unsafe fn hook(&self, orig_addr: usize, hook_addr: usize) -> Result<usize, Error>;

    /// # Safety
    /// No thread may be executing the trampoline returned for `orig_addr`.
    unsafe fn unhook(&self, orig_addr: usize) -> Result<(), Error>;
}

pub struct Interceptor {
    backend: Box<dyn HookBackend>,
    hook_map: Mutex<HookMap>
}

#[derive(Default)]
struct HookMap {
    by_target: FnvHashMap<usize, HookHandle>,
    by_hook: FnvHashMap<usize, usize>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookHandle {
    pub orig_addr: usize,
    pub hook_addr: usize,
    pub trampoline_addr: usize
}

impl Default for Interceptor {
    fn default() -> Self {
        Self::with_backend(interceptor_impl::NativeBackend::default())
    }
}

impl Interceptor {
    pub fn with_backend(backend: impl HookBackend + 'static) -> Interceptor {
        Interceptor {
            backend: Box::new(backend),
            hook_map: Mutex::default()
        }
    }

    /// Redirects `orig_addr` to `hook_addr` and returns the trampoline to the original code.
    /// Only one hook per target address and one target per replacement function is allowed.
    pub fn hook(&self, orig_addr: usize, hook_addr: usize) -> Result<usize, Error> {
        if orig_addr == 0 {
            return Err(Error::InvalidAddress(orig_addr));
        }
        if hook_addr == 0 {
            return Err(Error::InvalidAddress(hook_addr));
        }

        let mut guard = self.hook_map.lock().unwrap();
        let hook_map = &mut *guard;
        if hook_map.by_hook.contains_key(&hook_addr) {
            return Err(Error::HookingError(format!("replacement {:#x} is already installed", hook_addr)));
        }

        match hook_map.by_target.entry(orig_addr) {
            hash_map::Entry::Occupied(_) => Err(Error::AlreadyHooked(orig_addr)),
            hash_map::Entry::Vacant(e) => {
                let trampoline_addr = unsafe { self.backend.hook(orig_addr, hook_addr)? };
                e.insert(
                    HookHandle {
                        orig_addr,
                        hook_addr,
                        trampoline_addr
                    }
                );
                hook_map.by_hook.insert(hook_addr, orig_addr);

                debug!("Hooked {:#x} -> {:#x} (trampoline {:#x})", orig_addr, hook_addr, trampoline_addr);
                Ok(trampoline_addr)
            }
        }
    }

    pub fn get_trampoline_addr(&self, hook_addr: usize) -> usize {
        let hook_map = self.hook_map.lock().unwrap();
        if let Some(hook) = hook_map.by_hook.get(&hook_addr).and_then(|orig| hook_map.by_target.get(orig)) {
            hook.trampoline_addr
        }
        else {
            warn!("Attempted to get invalid hook: {:#x}", hook_addr);
            0
        }
    }

    pub fn is_hooked(&self, orig_addr: usize) -> bool {
        self.hook_map.lock().unwrap().by_target.contains_key(&orig_addr)
    }

    pub fn hook_count(&self) -> usize {
        self.hook_map.lock().unwrap().by_target.len()
    }

    /// Restores `orig_addr`. Returns `Ok(None)` if it was not hooked through this interceptor.
    ///
    /// The entry is only dropped once the backend has restored the code, so a hook the backend
    /// refuses to remove keeps its trampoline.
    pub fn unhook(&self, orig_addr: usize) -> Result<Option<HookHandle>, Error> {
        let mut hook_map = self.hook_map.lock().unwrap();
        let Some(hook) = hook_map.by_target.get(&orig_addr).copied() else {
            return Ok(None);
        };

        unsafe { self.backend.unhook(hook.orig_addr)? };
        hook_map.by_target.remove(&orig_addr);
        hook_map.by_hook.remove(&hook.hook_addr);

        debug!("Unhooked {:#x}", orig_addr);
        Ok(Some(hook))
    }

    /// Restores every hooked target. Targets the backend fails to restore stay registered and
    /// the last error is returned.
    pub fn unhook_all(&self) -> Result<(), Error> {
        let mut guard = self.hook_map.lock().unwrap();
        let hook_map = &mut *guard;

        let mut result = Ok(());
        hook_map.by_target.retain(|_, hook| {
            match unsafe { self.backend.unhook(hook.orig_addr) } {
                Ok(()) => {
                    hook_map.by_hook.remove(&hook.hook_addr);
                    false
                }
                Err(e) => {
                    error!("Failed to unhook {:#x}: {}", hook.orig_addr, e);
                    result = Err(e);
                    true
                }
            }
        });
        result
    }
}

/// Trampoline of the hook whose replacement is `$hook`, as a `$type`. Returns
/// `Default::default()` from the calling hook when no trampoline is registered.
macro_rules! get_orig_fn {
    ($hook:ident, $type:tt) => ({
        let trampoline_addr = crate::core::RetroCam::instance().interceptor.get_trampoline_addr($hook as usize);
        if trampoline_addr == 0 {
            error!("No original function for {}", stringify!($hook));
            return Default::default();
        }
        unsafe { std::mem::transmute::<usize, $type>(trampoline_addr) }
    })
}

#[cfg(test)]
mod tests {
    use crate::core::testing::FakeBackend;

    use super::*;

    #[test]
    fn hook_and_unhook_restore_table() {
        let backend = FakeBackend::default();
        backend.define(0x1000, 0xA);
        let interceptor = Interceptor::with_backend(backend.clone());

        let trampoline = interceptor.hook(0x1000, 0xB).expect("hook");
        assert_eq!(trampoline, 0xA);
        assert_eq!(backend.current(0x1000), Some(0xB));
        assert_eq!(interceptor.get_trampoline_addr(0xB), 0xA);
        assert!(interceptor.is_hooked(0x1000));

        let handle = interceptor.unhook(0x1000).expect("unhook").expect("was hooked");
        assert_eq!(handle.trampoline_addr, 0xA);
        assert_eq!(backend.current(0x1000), Some(0xA));
        assert_eq!(interceptor.get_trampoline_addr(0xB), 0);
        assert!(interceptor.unhook(0x1000).expect("unhook").is_none());
    }

    #[test]
    fn failed_unhook_keeps_trampoline() {
        let backend = FakeBackend::default();
        backend.define(0x1000, 0xA);
        let interceptor = Interceptor::with_backend(backend.clone());
        interceptor.hook(0x1000, 0xB).expect("hook");

        backend.refuse_unhook(true);
        assert!(matches!(interceptor.unhook(0x1000), Err(Error::HookingError(_))));
        assert_eq!(backend.current(0x1000), Some(0xB));
        assert!(interceptor.is_hooked(0x1000));
        assert_eq!(interceptor.get_trampoline_addr(0xB), 0xA);

        backend.refuse_unhook(false);
        assert!(interceptor.unhook(0x1000).expect("unhook").is_some());
        assert_eq!(backend.current(0x1000), Some(0xA));
        assert!(!interceptor.is_hooked(0x1000));
    }

    #[test]
    fn second_hook_on_target_is_rejected() {
        let backend = FakeBackend::default();
        backend.define(0x1000, 0xA);
        let interceptor = Interceptor::with_backend(backend.clone());

        interceptor.hook(0x1000, 0xB).expect("hook");
        assert!(matches!(interceptor.hook(0x1000, 0xC), Err(Error::AlreadyHooked(0x1000))));
        assert_eq!(backend.current(0x1000), Some(0xB));
        assert_eq!(backend.patch_count(), 1);
    }

    #[test]
    fn replacement_reuse_is_rejected() {
        let backend = FakeBackend::default();
        backend.define(0x1000, 0xA);
        backend.define(0x2000, 0xD);
        let interceptor = Interceptor::with_backend(backend.clone());

        interceptor.hook(0x1000, 0xB).expect("hook");
        assert!(matches!(interceptor.hook(0x2000, 0xB), Err(Error::HookingError(_))));
        assert_eq!(backend.current(0x2000), Some(0xD));
    }

    #[test]
    fn backend_failure_leaves_no_entry() {
        let backend = FakeBackend::default();
        let interceptor = Interceptor::with_backend(backend.clone());

        assert!(matches!(interceptor.hook(0x1000, 0xB), Err(Error::HookingError(_))));
        assert!(!interceptor.is_hooked(0x1000));
        assert_eq!(interceptor.hook_count(), 0);
    }

    #[test]
    fn unhook_all_restores_everything() {
        let backend = FakeBackend::default();
        backend.define(0x1000, 0xA);
        backend.define(0x2000, 0xD);
        let interceptor = Interceptor::with_backend(backend.clone());

        interceptor.hook(0x1000, 0xB).expect("hook");
        interceptor.hook(0x2000, 0xE).expect("hook");
        interceptor.unhook_all().expect("unhook all");

        assert_eq!(interceptor.hook_count(), 0);
        assert_eq!(backend.current(0x1000), Some(0xA));
        assert_eq!(backend.current(0x2000), Some(0xD));
    }

    #[test]
    fn unhook_all_keeps_refused_targets() {
        let backend = FakeBackend::default();
        backend.define(0x1000, 0xA);
        let interceptor = Interceptor::with_backend(backend.clone());
        interceptor.hook(0x1000, 0xB).expect("hook");

        backend.refuse_unhook(true);
        assert!(interceptor.unhook_all().is_err());
        assert_eq!(interceptor.hook_count(), 1);
        assert_eq!(interceptor.get_trampoline_addr(0xB), 0xA);

        backend.refuse_unhook(false);
        interceptor.unhook_all().expect("unhook all");
        assert_eq!(interceptor.hook_count(), 0);
        assert_eq!(backend.current(0x1000), Some(0xA));
    }
}
