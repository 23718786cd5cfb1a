use std::{ffi::CStr, os::raw::c_void, ptr::null_mut, sync::atomic::{self, AtomicUsize}};

use once_cell::sync::OnceCell;

use crate::core::{
    metadata::{ClassHandle, Metadata, MethodDef, TypeDef},
    signature::{FunctionSignature, ParamType},
    utils::c_str_lossy,
    Error
};

use super::{api::Il2CppApi, types::*};

static HANDLE: AtomicUsize = AtomicUsize::new(0);
static API: OnceCell<Il2CppApi> = OnceCell::new();

pub fn set_handle(handle: usize) {
    HANDLE.store(handle, atomic::Ordering::Relaxed);
}

pub fn handle() -> usize {
    HANDLE.load(atomic::Ordering::Relaxed)
}

/// Resolves the runtime exports. Requires [`set_handle`] to have been called.
pub fn init() -> Result<&'static Il2CppApi, Error> {
    API.get_or_try_init(|| {
        let handle = handle();
        if handle == 0 {
            return Err(Error::InvalidAddress(handle));
        }
        unsafe { Il2CppApi::load(handle as *mut c_void) }
    })
}

pub fn api() -> Option<&'static Il2CppApi> {
    API.get()
}

/// [`Metadata`] backed by the live il2cpp runtime.
pub struct Il2CppMetadata {
    api: &'static Il2CppApi
}

impl Il2CppMetadata {
    pub fn new(api: &'static Il2CppApi) -> Il2CppMetadata {
        Il2CppMetadata { api }
    }

    pub fn get_assembly_image(&self, assembly_name: &CStr) -> Result<*const Il2CppImage, Error> {
        let api = self.api;
        let assembly = unsafe { (api.il2cpp_domain_assembly_open)((api.il2cpp_domain_get)(), assembly_name.as_ptr()) };
        if assembly.is_null() {
            Err(Error::AssemblyNotFound(assembly_name.to_string_lossy().into_owned()))
        }
        else {
            Ok(unsafe { (api.il2cpp_assembly_get_image)(assembly) })
        }
    }

    pub fn get_class(&self, image: *const Il2CppImage, namespace: &CStr, class_name: &CStr) -> Result<ClassHandle, Error> {
        let class = unsafe { (self.api.il2cpp_class_from_name)(image, namespace.as_ptr(), class_name.as_ptr()) };
        if class.is_null() {
            Err(Error::ClassNotFound(
                namespace.to_string_lossy().into_owned(),
                class_name.to_string_lossy().into_owned()
            ))
        }
        else {
            Ok(ClassHandle(class as usize))
        }
    }

    fn param_type(&self, type_: *const Il2CppType) -> ParamType {
        let api = self.api;
        let name_ptr = unsafe { (api.il2cpp_type_get_name)(type_) };
        let mut name = unsafe { c_str_lossy(name_ptr) };
        if !name_ptr.is_null() {
            unsafe { (api.il2cpp_free)(name_ptr as *mut c_void) };
        }

        // By-ref types are reported as "T&"
        if name.ends_with('&') {
            name.pop();
        }

        ParamType::new(name, unsafe { (api.il2cpp_type_is_byref)(type_) })
    }

    fn method_def(&self, method: *const MethodInfo) -> MethodDef {
        let api = self.api;
        let param_count = unsafe { (api.il2cpp_method_get_param_count)(method) };
        let signature = FunctionSignature::new(
            (0..param_count).map(|i| self.param_type(unsafe { (api.il2cpp_method_get_param)(method, i) }))
        );

        MethodDef {
            name: unsafe { c_str_lossy((api.il2cpp_method_get_name)(method)) },
            is_static: !unsafe { (api.il2cpp_method_is_instance)(method) },
            signature,
            method_pointer: unsafe { (*method).methodPointer }
        }
    }
}

impl Metadata for Il2CppMetadata {
    fn type_name(&self, class: ClassHandle) -> String {
        unsafe { c_str_lossy((self.api.il2cpp_class_get_name)(class.0 as *mut Il2CppClass)) }
    }

    fn nested_types(&self, class: ClassHandle) -> Vec<TypeDef> {
        let mut types = Vec::new();
        let mut iter: *mut c_void = null_mut();
        loop {
            let nested = unsafe { (self.api.il2cpp_class_get_nested_types)(class.0 as *mut Il2CppClass, &mut iter) };
            if nested.is_null() {
                break;
            }

            let handle = ClassHandle(nested as usize);
            types.push(TypeDef {
                class: handle,
                name: self.type_name(handle)
            });
        }
        types
    }

    fn methods(&self, class: ClassHandle) -> Vec<MethodDef> {
        let mut methods = Vec::new();
        let mut iter: *mut c_void = null_mut();
        loop {
            let method = unsafe { (self.api.il2cpp_class_get_methods)(class.0 as *mut Il2CppClass, &mut iter) };
            if method.is_null() {
                break;
            }
            methods.push(self.method_def(method));
        }
        methods
    }
}
