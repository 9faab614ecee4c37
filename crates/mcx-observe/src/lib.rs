//! Logging bootstrap for mcx binaries.
mod logger;
pub use logger::*;
