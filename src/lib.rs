#[macro_use] extern crate log;

#[macro_use] pub mod core;
pub mod il2cpp;

/** Windows **/
#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "windows")]
use windows::{log_impl, game_impl, symbols_impl, interceptor_impl};

/** Unix (test and tooling host, no loader entry point) **/
#[cfg(unix)]
mod unix;

#[cfg(unix)]
use unix::{log_impl, game_impl, symbols_impl, interceptor_impl};
