use std::ffi::c_void;

use crate::{
    core::{
        listener::CursorPositionUpdate,
        metadata::{Metadata, MethodDef, TypeDef},
        registry::HookRegistry,
        signature::{FunctionSignature, ParamType}
    },
    il2cpp::{hook::{notify_listener, Detour}, symbols::Il2CppMetadata, types::Il2CppImage}
};

const EXECUTE_PARAMS: [ParamType; 6] = [
    ParamType::by_ref("Unity.Physics.CollisionWorld"),
    ParamType::by_ref("System.Int32"),
    ParamType::by_ref("FadeTargetsSingleton"),
    ParamType::by_ref("CurrentFadingDataSingleton"),
    ParamType::by_ref("CursorPosition"),
    ParamType::by_ref("Unity.Entities.EntityManager")
];

type ExecuteFn = extern "C" fn(
    this: *mut c_void, collision_world: *mut c_void, height_level: *mut i32, fade_targets: *mut c_void,
    fade_data: *mut c_void, cursor_position: *mut c_void, entity_manager: *mut c_void
);
extern "C" fn Execute(
    this: *mut c_void, collision_world: *mut c_void, height_level: *mut i32, fade_targets: *mut c_void,
    fade_data: *mut c_void, cursor_position: *mut c_void, entity_manager: *mut c_void
) {
    let args = CursorPositionUpdate {
        collision_world,
        height_level,
        fade_targets,
        fade_data,
        cursor_position,
        entity_manager
    };
    notify_listener(false, |listener, config| listener.on_cursor_position(config, &args));
    get_orig_fn!(Execute, ExecuteFn)(this, collision_world, height_level, fade_targets, fade_data, cursor_position, entity_manager);
}

/// Lambda job bodies are emitted as `Execute` or `<OriginalName>_Execute`.
fn is_execute(method: &MethodDef, signature: &FunctionSignature) -> bool {
    !method.is_static &&
    (method.name == "Execute" || method.name.ends_with("_Execute")) &&
    signature.matches(method)
}

pub fn init(metadata: &Il2CppMetadata, detour: &Detour, registry: &mut HookRegistry, ProjectM: *const Il2CppImage) {
    get_class_or_return!(metadata, ProjectM, c"ProjectM", CursorPositionSystem);

    // Builds that emit more than one lambda job keep the cursor update in the first
    let has_lambda_job_0 = metadata.nested_types(CursorPositionSystem)
        .iter()
        .any(|t| t.name.contains("LambdaJob_0"));
    let job_name = if has_lambda_job_0 { "LambdaJob_0" } else { "LambdaJob" };
    let signature = FunctionSignature::new(EXECUTE_PARAMS);

    registry.install("CursorPositionSystem.Execute", || {
        detour.create_by_signature(
            CursorPositionSystem,
            |t: &TypeDef| t.name.contains(job_name),
            |m: &MethodDef| is_execute(m, &signature),
            Execute as usize
        )
    });
}
