//! Subprocess verifier: runs the model-checker executable once per check.
//!
//! The prepared input reaches the checker on stdin, or through a temp file when an
//! argument is exactly [`INPUT_PLACEHOLDER`]. The verdict is read from stdout markers.
mod config;
pub use config::{OutputLogConfig, SubprocessVerifierConfig};

mod output;
mod verdict;

mod verifier;
pub use verifier::SubprocessVerifier;

/// Argument replaced with the path of the temp file holding the prepared input.
pub const INPUT_PLACEHOLDER: &str = "{input}";
