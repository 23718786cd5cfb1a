#![allow(non_snake_case)]

macro_rules! opaque_type {
    ($($name:ident),*) => {
        $(
            #[repr(C)]
            pub struct $name {
                _data: [u8; 0],
                _marker: std::marker::PhantomData<(*mut u8, std::marker::PhantomPinned)>
            }
        )*
    };
}

opaque_type!(Il2CppDomain, Il2CppAssembly, Il2CppImage, Il2CppClass, Il2CppType);

/// Leading field of the runtime's method descriptor. The rest of the layout differs between
/// Unity versions and is never read.
#[repr(C)]
pub struct MethodInfo {
    pub methodPointer: usize
}
