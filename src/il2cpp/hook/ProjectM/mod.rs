use crate::{core::registry::HookRegistry, il2cpp::symbols::Il2CppMetadata};

use super::Detour;

mod TopdownCameraSystem;
mod CursorPositionSystem;
mod GamepadCursorSystem;

pub fn init(metadata: &Il2CppMetadata, detour: &Detour, registry: &mut HookRegistry) {
    get_assembly_image_or_return!(metadata, image, c"ProjectM.dll");

    TopdownCameraSystem::init(metadata, detour, registry, image);
    CursorPositionSystem::init(metadata, detour, registry, image);
    GamepadCursorSystem::init(metadata, detour, registry, image);
}
