//! Coordination layer for running model-checker jobs against a bounded pool.
//!
//! Two coordinators share the same job body ([`JobContext`]):
//! - [`Parallelizer`]: long-lived, driven by [`Command`](mcx_model::Command)s over a
//!   single-slot channel, publishes generation-tagged results on an unbounded channel;
//! - [`BatchRunner`]: one-shot race that returns the first successful check of a batch.
pub mod error;
pub use error::CoreError;

pub mod channel;
pub use channel::{CommandPeek, CommandReceiver, CommandSendError, CommandSender, command_channel};

mod guard;
pub use guard::GuardSnapshot;

pub mod metrics;
pub use metrics::{JobOutcome, MetricsBackend, MetricsHandle, NoOpMetrics, noop_metrics};

pub mod parallelizer;
pub use parallelizer::{
    DriverChannels, Parallelizer, ParallelizerConfig, ParallelizerProbe, ResultSink,
};

mod pool;

pub mod runner;
pub use runner::{BatchRunner, RunnerError, RunnerState};

pub mod verifier;
pub use verifier::{
    CheckError, JobContext, ModelBuilder, PrepareError, PreparedInput, TemplateBuilder, Verifier,
    VerifyError,
};

/// Coordinator label used in logs and metrics for the command-driven pipeline.
pub const COORDINATOR_PARALLELIZER: &str = "parallelizer";

/// Coordinator label used in logs and metrics for the race runner.
pub const COORDINATOR_RUNNER: &str = "runner";

pub mod prelude {
    pub use crate::error::CoreError;
    pub use crate::parallelizer::{DriverChannels, Parallelizer, ParallelizerConfig};
    pub use crate::runner::{BatchRunner, RunnerError};
    pub use crate::verifier::{JobContext, ModelBuilder, Verifier, VerifyError};
}
