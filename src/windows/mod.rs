pub mod main;
pub mod hook;
pub mod ffi;
pub mod utils;

pub mod log_impl;
pub mod game_impl;
pub mod symbols_impl;
pub mod interceptor_impl;
