#![allow(non_snake_case)]

use std::{os::raw::c_char, path::Path};

use windows::{core::{w, PCWSTR}, Win32::Foundation::HMODULE};

use crate::{core::{Error, RetroCam}, il2cpp};

use super::{ffi, utils};

const IL2CPP_LIB: &str = "GameAssembly.dll";

fn is_il2cpp_lib(filename: &str) -> bool {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case(IL2CPP_LIB))
}

type LoadLibraryWFn = extern "C" fn(filename: PCWSTR) -> HMODULE;
extern "C" fn LoadLibraryW(filename: PCWSTR) -> HMODULE {
    let handle = get_orig_fn!(LoadLibraryW, LoadLibraryWFn)(filename);
    if handle.is_invalid() {
        return handle;
    }

    let Ok(filename_str) = (unsafe { filename.to_string() }) else {
        return handle;
    };

    if is_il2cpp_lib(&filename_str) {
        if let Err(e) = on_game_assembly_loaded(handle.0 as usize) {
            error!("{}", e);
        }
        if let Err(e) = RetroCam::instance().interceptor.unhook(ffi::LoadLibraryW as usize) {
            error!("Failed to unhook LoadLibraryW: {}", e);
        }
    }
    handle
}

type Il2CppInitFn = extern "C" fn(domain_name: *const c_char) -> i32;
extern "C" fn il2cpp_init(domain_name: *const c_char) -> i32 {
    let res = get_orig_fn!(il2cpp_init, Il2CppInitFn)(domain_name);

    RetroCam::instance().on_il2cpp_initialized();
    res
}

fn on_game_assembly_loaded(handle: usize) -> Result<(), Error> {
    info!("Got il2cpp handle");
    il2cpp::symbols::set_handle(handle);

    let il2cpp_init_addr = utils::get_proc_address(HMODULE(handle as isize), c"il2cpp_init");
    if il2cpp_init_addr == 0 {
        return Err(Error::SymbolNotFound(IL2CPP_LIB.to_owned(), "il2cpp_init".to_owned()));
    }

    let retrocam = RetroCam::instance();
    if !retrocam.interceptor.is_hooked(il2cpp_init_addr) {
        retrocam.interceptor.hook(il2cpp_init_addr, il2cpp_init as usize)?;
    }
    Ok(())
}

fn init_internal() -> Result<(), Error> {
    // The plugin might be loaded after the game assembly (e.g. by a mod loader)
    let handle = utils::get_module_handle(w!("GameAssembly.dll"));
    if handle != 0 {
        return on_game_assembly_loaded(handle);
    }

    info!("Hooking LoadLibraryW");
    RetroCam::instance().interceptor.hook(ffi::LoadLibraryW as usize, LoadLibraryW as usize)?;
    Ok(())
}

pub fn init() {
    init_internal().unwrap_or_else(|e| {
        error!("Init failed: {}", e);
    });
}
