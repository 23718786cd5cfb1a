use std::ffi::c_void;

use super::retrocam::Config;

/// Arguments of `TopdownCameraSystem.CameraUpdateJob.UpdateCamera`, all passed by reference.
#[derive(Clone, Copy)]
pub struct CameraUpdate {
    pub camera_target: *mut c_void,
    pub topdown_camera: *mut c_void,
    pub camera_state: *mut c_void,
    pub translation: *mut c_void,
    pub rotation: *mut c_void
}

/// Arguments of the `CursorPositionSystem` lambda job body.
#[derive(Clone, Copy)]
pub struct CursorPositionUpdate {
    pub collision_world: *mut c_void,
    pub height_level: *mut i32,
    pub fade_targets: *mut c_void,
    pub fade_data: *mut c_void,
    pub cursor_position: *mut c_void,
    pub entity_manager: *mut c_void
}

/// Application logic run by the camera hooks before the game's own code.
///
/// Callbacks come from the game's worker threads, possibly several at once. Pointers are only
/// valid for the duration of the call. Input callbacks are only made while `Config::enabled` is
/// set; the camera and cursor callbacks always run so the listener can put the game's own
/// values back after the plugin is switched off.
pub trait HookListener: Send + Sync {
    fn on_handle_input(&self, _config: &Config, _input_state: *mut c_void) {}

    fn on_update_camera(&self, _config: &Config, _args: &CameraUpdate) {}

    fn on_cursor_position(&self, _config: &Config, _args: &CursorPositionUpdate) {}

    fn on_gamepad_input(&self, _config: &Config, _input_state: *mut c_void) {}
}

/// Runs `f` with `listener`, if there is one. With `require_enabled`, nothing runs while
/// `config.enabled` is off. Returns whether `f` ran.
pub fn dispatch(
    config: &Config,
    listener: Option<&dyn HookListener>,
    require_enabled: bool,
    f: impl FnOnce(&dyn HookListener, &Config)
) -> bool {
    if require_enabled && !config.enabled {
        return false;
    }

    match listener {
        Some(listener) => {
            f(listener, config);
            true
        }
        None => false
    }
}
