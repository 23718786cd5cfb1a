use std::{fs::File, path::Path};

use simplelog::{ConfigBuilder, WriteLogger};

pub fn init(filter_level: log::LevelFilter, data_dir: Option<&Path>) {
    let config = ConfigBuilder::new()
        .set_target_level(log::LevelFilter::Error)
        .build();

    let file = data_dir.and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        File::create(dir.join("retrocam.log")).ok()
    });

    match file {
        Some(file) => {
            WriteLogger::init(filter_level, config, file).ok();
        }
        None => {
            WriteLogger::init(filter_level, config, std::io::stderr()).ok();
        }
    }
}
