pub mod retrocam;
pub use retrocam::RetroCam;

mod error;
pub use error::Error;

pub mod game;
pub mod log;
pub mod utils;

pub mod memory;
pub mod inline_hook;
#[macro_use] pub mod interceptor;
pub use interceptor::Interceptor;

pub mod resolver;
pub mod signature;
pub mod metadata;
pub mod detour;
pub mod registry;
pub mod listener;

#[cfg(test)]
pub mod testing;
