use std::ffi::c_void;

use crate::{
    core::{listener::CameraUpdate, registry::HookRegistry},
    il2cpp::{hook::{notify_listener, Detour}, symbols::Il2CppMetadata, types::Il2CppImage}
};

type HandleInputFn = extern "C" fn(this: *mut c_void, input_state: *mut c_void);
extern "C" fn HandleInput(this: *mut c_void, input_state: *mut c_void) {
    notify_listener(true, |listener, config| listener.on_handle_input(config, input_state));
    get_orig_fn!(HandleInput, HandleInputFn)(this, input_state);
}

type UpdateCameraFn = extern "C" fn(
    this: *mut c_void, camera_target: *mut c_void, topdown_camera: *mut c_void,
    camera_state: *mut c_void, translation: *mut c_void, rotation: *mut c_void
);
extern "C" fn UpdateCamera(
    this: *mut c_void, camera_target: *mut c_void, topdown_camera: *mut c_void,
    camera_state: *mut c_void, translation: *mut c_void, rotation: *mut c_void
) {
    let args = CameraUpdate {
        camera_target,
        topdown_camera,
        camera_state,
        translation,
        rotation
    };
    notify_listener(false, |listener, config| listener.on_update_camera(config, &args));
    get_orig_fn!(UpdateCamera, UpdateCameraFn)(this, camera_target, topdown_camera, camera_state, translation, rotation);
}

pub fn init(metadata: &Il2CppMetadata, detour: &Detour, registry: &mut HookRegistry, ProjectM: *const Il2CppImage) {
    get_class_or_return!(metadata, ProjectM, c"ProjectM", TopdownCameraSystem);

    registry.install("TopdownCameraSystem.HandleInput", || {
        detour.create(TopdownCameraSystem, "HandleInput", HandleInput as usize)
    });

    // The job struct's name is generated, only "CameraUpdateJob" is stable
    registry.install("TopdownCameraSystem.UpdateCamera", || {
        detour.create_nested(TopdownCameraSystem, "CameraUpdateJob", "UpdateCamera", UpdateCamera as usize)
    });
}
