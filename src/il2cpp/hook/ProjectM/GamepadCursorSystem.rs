use std::ffi::c_void;

use crate::{
    core::registry::HookRegistry,
    il2cpp::{hook::{notify_listener, Detour}, symbols::Il2CppMetadata, types::Il2CppImage}
};

type HandleInputFn = extern "C" fn(this: *mut c_void, input_state: *mut c_void);
extern "C" fn HandleInput(this: *mut c_void, input_state: *mut c_void) {
    notify_listener(true, |listener, config| listener.on_gamepad_input(config, input_state));
    get_orig_fn!(HandleInput, HandleInputFn)(this, input_state);
}

pub fn init(metadata: &Il2CppMetadata, detour: &Detour, registry: &mut HookRegistry, ProjectM: *const Il2CppImage) {
    get_class_or_return!(metadata, ProjectM, c"ProjectM", GamepadCursorSystem);

    registry.install("GamepadCursorSystem.HandleInput", || {
        detour.create(GamepadCursorSystem, "HandleInput", HandleInput as usize)
    });
}
