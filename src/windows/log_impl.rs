use std::path::Path;

pub fn init(filter_level: log::LevelFilter, _data_dir: Option<&Path>) {
    // Output goes to the debugger (DebugView, an attached IDE...)
    if let Some(level) = filter_level.to_level() {
        windebug_logger::init_with_level(level).ok();
    }
}
