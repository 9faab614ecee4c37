mod domain;
pub use domain::{CheckableUnit, Generation, Invariant, InvariantKind, ModelSource};

mod error;
pub use error::{ModelError, ModelResult};

mod command;
pub use command::{Command, CommandKind};

mod result;
pub use result::{FailureReason, FailureStage, JobResult, Verdict, VerificationOutcome};

mod strategy;
pub use strategy::PublishPolicy;
