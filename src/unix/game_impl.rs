use std::path::{Path, PathBuf};

pub fn get_exec_path() -> PathBuf {
    std::env::current_exe().unwrap_or_default()
}

pub fn get_data_dir(_exec_path: &Path) -> PathBuf {
    if let Some(dir) = std::env::var_os("RETROCAM_DATA_DIR") {
        return PathBuf::from(dir);
    }
    std::env::current_dir().unwrap_or_default()
}
