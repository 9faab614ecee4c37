//! Seams to the two external collaborators of a job: model construction
//! ([`ModelBuilder`]) and the checker process ([`Verifier`]).
mod context;
pub use context::JobContext;

mod error;
pub use error::{CheckError, PrepareError, VerifyError};

mod template;
pub use template::TemplateBuilder;

use std::{fmt, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use mcx_model::{CheckableUnit, VerificationOutcome};

/// Checker input produced from a [`CheckableUnit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedInput {
    name: String,
    text: String,
}

impl PreparedInput {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Name of the input, used for temp files and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for PreparedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PreparedInput(name='{}', len={})", self.name, self.text.len())
    }
}

/// Turns a unit into text the checker understands.
pub trait ModelBuilder: Send + Sync {
    fn prepare(&self, unit: &CheckableUnit) -> Result<PreparedInput, PrepareError>;
}

/// One invocation of the external model checker.
///
/// Implementations must honour `timeout` and should stop early when `cancel` fires;
/// the job body additionally abandons the call on cancellation.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Verifier name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    async fn verify(
        &self,
        input: &PreparedInput,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<VerificationOutcome, VerifyError>;
}
