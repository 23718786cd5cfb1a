//! Platform backends for unix hosts.
//!
//! There is no load-time entry point here: nothing sets the il2cpp handle or calls
//! `RetroCam::on_il2cpp_initialized`, so the il2cpp hook sites never run on unix. These
//! backends exist so the core (resolver, inline hooks, registry, config) can be built, tested
//! and driven by tooling outside the game, with the `cdylib` being inert.

pub mod log_impl;
pub mod game_impl;
pub mod symbols_impl;
pub mod interceptor_impl;
