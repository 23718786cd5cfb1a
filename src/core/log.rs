use std::path::Path;

use crate::log_impl;

/// Installs the platform logger. Only the first call has any effect.
pub fn init(debug_mode: bool, data_dir: Option<&Path>) {
    let filter_level = if debug_mode {
        log::LevelFilter::Debug
    }
    else {
        log::LevelFilter::Info
    };

    log_impl::init(filter_level, data_dir);
}
