use std::os::raw::{c_char, c_void};

use crate::{core::Error, symbols_impl};

use super::types::*;

pub const GAME_ASSEMBLY: &str = "GameAssembly";

macro_rules! il2cpp_api {
    ($($name:ident: fn($($arg_ty:ty),*) $(-> $ret:ty)?;)*) => {
        /// Runtime exports used for metadata lookups, resolved once from the loaded module.
        pub struct Il2CppApi {
            $(pub $name: unsafe extern "C" fn($($arg_ty),*) $(-> $ret)?,)*
        }

        impl Il2CppApi {
            /// # Safety
            /// `handle` must be the module handle of the loaded runtime.
            pub unsafe fn load(handle: *mut c_void) -> Result<Il2CppApi, Error> {
                Ok(Il2CppApi {
                    $($name: {
                        let addr = symbols_impl::dlsym(handle, stringify!($name));
                        if addr == 0 {
                            return Err(Error::SymbolNotFound(GAME_ASSEMBLY.to_owned(), stringify!($name).to_owned()));
                        }
                        std::mem::transmute::<usize, unsafe extern "C" fn($($arg_ty),*) $(-> $ret)?>(addr)
                    },)*
                })
            }
        }
    };
}

il2cpp_api! {
    il2cpp_domain_get: fn() -> *mut Il2CppDomain;
    il2cpp_domain_assembly_open: fn(*mut Il2CppDomain, *const c_char) -> *const Il2CppAssembly;
    il2cpp_assembly_get_image: fn(*const Il2CppAssembly) -> *const Il2CppImage;
    il2cpp_class_from_name: fn(*const Il2CppImage, *const c_char, *const c_char) -> *mut Il2CppClass;
    il2cpp_class_get_name: fn(*mut Il2CppClass) -> *const c_char;
    il2cpp_class_get_nested_types: fn(*mut Il2CppClass, *mut *mut c_void) -> *mut Il2CppClass;
    il2cpp_class_get_methods: fn(*mut Il2CppClass, *mut *mut c_void) -> *const MethodInfo;
    il2cpp_method_get_name: fn(*const MethodInfo) -> *const c_char;
    il2cpp_method_get_param_count: fn(*const MethodInfo) -> u32;
    il2cpp_method_get_param: fn(*const MethodInfo, u32) -> *const Il2CppType;
    il2cpp_method_is_instance: fn(*const MethodInfo) -> bool;
    il2cpp_type_get_name: fn(*const Il2CppType) -> *mut c_char;
    il2cpp_type_is_byref: fn(*const Il2CppType) -> bool;
    il2cpp_free: fn(*mut c_void);
}
