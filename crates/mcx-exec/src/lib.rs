//! Concrete verifiers for `mcx-core`.
mod error;
pub use error::ExecError;

mod id;
pub use id::make_run_id;

/// Verifier name reported by [`subprocess::SubprocessVerifier`].
pub const VERIFIER_SUBPROCESS: &str = "subprocess";

#[cfg(feature = "subprocess")]
pub mod subprocess;
