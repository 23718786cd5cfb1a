use std::path::{Path, PathBuf};

use super::utils;

pub fn get_exec_path() -> PathBuf {
    utils::get_exec_path()
}

pub fn get_data_dir(exec_path: &Path) -> PathBuf {
    exec_path
        .parent()
        .map(|dir| dir.to_owned())
        .unwrap_or_default()
        .join("retrocam")
}
