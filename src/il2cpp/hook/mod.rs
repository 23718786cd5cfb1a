#![allow(non_snake_case)]

use crate::core::{
    detour::NativeDetour,
    listener::{self, HookListener},
    memory::ProcessMemory,
    registry::HookRegistry,
    retrocam::Config,
    RetroCam
};

use super::symbols::{self, Il2CppMetadata};

pub type Detour<'a> = NativeDetour<'a, Il2CppMetadata, ProcessMemory>;

macro_rules! get_assembly_image_or_return {
    ($metadata:ident, $var_name:ident, $assembly_name:literal) => (
        let $var_name = match $metadata.get_assembly_image($assembly_name) {
            Ok(v) => v,
            Err(e) => {
                error!("{}", e);
                return;
            }
        };
    )
}

macro_rules! get_class_or_return {
    ($metadata:ident, $image:ident, $namespace:literal, $class_name:ident) => (
        let $class_name = match $metadata.get_class($image, $namespace, c_str!($class_name)) {
            Ok(v) => v,
            Err(e) => {
                error!("{}", e);
                return;
            }
        };
    )
}

macro_rules! c_str {
    ($name:ident) => (
        match std::ffi::CStr::from_bytes_with_nul(concat!(stringify!($name), "\0").as_bytes()) {
            Ok(v) => v,
            Err(_) => unreachable!()
        }
    )
}

/// Runs `f` with the application's listener, see [`listener::dispatch`].
pub fn notify_listener(require_enabled: bool, f: impl FnOnce(&dyn HookListener, &Config)) {
    let retrocam = RetroCam::instance();
    let listener = retrocam.listener();
    listener::dispatch(&retrocam.config.load(), listener.as_deref(), require_enabled, f);
}

mod ProjectM;

pub fn init(registry: &mut HookRegistry) {
    info!("Initializing il2cpp hooks");

    let Some(api) = symbols::api() else {
        error!("il2cpp API is not loaded");
        return;
    };
    let metadata = Il2CppMetadata::new(api);
    let memory = ProcessMemory;
    let retrocam = RetroCam::instance();
    let detour = NativeDetour::new(&metadata, &memory, &retrocam.interceptor, retrocam.config.load().resolver);

    ProjectM::init(&metadata, &detour, registry);

    info!("Hooking finished");
}
