pub mod types;
pub mod api;
pub mod symbols;
pub mod hook;
