use std::fmt;

#[derive(Debug)]
pub enum Error {
    SymbolNotFound(String, String),
    AssemblyNotFound(String),
    ClassNotFound(String, String),
    TargetNotFound(String),
    SignatureMismatch(String),
    AmbiguousTarget(String, usize),
    InvalidAddress(usize),
    AlreadyHooked(usize),
    HookingError(String),
    MemoryProtection(String),
    IoError(std::io::Error),
    JsonParseError(serde_json::Error)
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SymbolNotFound(module_name, symbol_name) => {
                write!(f, "Symbol not found: {} (module {})", symbol_name, module_name)
            }
            Error::AssemblyNotFound(name) => {
                write!(f, "Assembly not found: {}", name)
            }
            Error::ClassNotFound(namespace, class_name) => {
                write!(f, "Class not found: {}::{}", namespace, class_name)
            }
            Error::TargetNotFound(what) => {
                write!(f, "Hook target not found: {}", what)
            }
            Error::SignatureMismatch(what) => {
                write!(f, "No member with a matching signature: {}", what)
            }
            Error::AmbiguousTarget(what, count) => {
                write!(f, "Ambiguous hook target: {} ({} candidates)", what, count)
            }
            Error::InvalidAddress(addr) => {
                write!(f, "Invalid address: {:#x}", addr)
            }
            Error::AlreadyHooked(addr) => {
                write!(f, "Address already hooked: {:#x}", addr)
            }
            Error::HookingError(e) => {
                write!(f, "Hooking failed: {}", e)
            }
            Error::MemoryProtection(e) => {
                write!(f, "Failed to change memory protection: {}", e)
            }
            Error::IoError(error) => {
                write!(f, "I/O error: {}", error)
            }
            Error::JsonParseError(error) => {
                write!(f, "Failed to parse JSON: {}", error)
            }
        }
    }
}

impl std::error::Error for Error {
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::JsonParseError(e)
    }
}

impl From<region::Error> for Error {
    fn from(e: region::Error) -> Self {
        Error::MemoryProtection(e.to_string())
    }
}
