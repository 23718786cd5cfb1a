use std::path::PathBuf;

use crate::game_impl;

/// Host process information.
pub struct Game {
    pub exec_path: PathBuf,
    pub data_dir: PathBuf
}

impl Game {
    pub fn init() -> Game {
        let exec_path = game_impl::get_exec_path();
        let data_dir = game_impl::get_data_dir(&exec_path);

        Game {
            exec_path,
            data_dir
        }
    }
}
