//! Command-driven coordinator.
//!
//! The [`Parallelizer`] is the single consumer of a [`CommandSender`]'s commands.
//! It runs `StartK`/`StartOne`/`StopAll` strictly one at a time and in arrival order,
//! submitting jobs to a worker pool of `num_parallel` slots. Finished jobs publish a
//! generation-tagged [`JobResult`] through a [`ResultSink`]; results from a generation the
//! coordinator has already left are dropped without touching the running count.
mod control;
mod job;
mod publish;
pub use publish::ResultSink;


use std::{num::NonZeroUsize, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use mcx_model::{Command, JobResult, PublishPolicy};

use crate::{
    channel::{CommandReceiver, CommandSendError, CommandSender, command_channel},
    error::CoreError,
    guard::{GenerationGuard, GuardSnapshot},
    verifier::JobContext,
};

use control::Shared;

/// Parallelizer settings, fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParallelizerConfig {
    /// Maximum number of jobs in flight.
    pub num_parallel: usize,
    /// Retry policy for result publication.
    pub publish: PublishPolicy,
}

impl Default for ParallelizerConfig {
    fn default() -> Self {
        Self {
            num_parallel: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            publish: PublishPolicy::default(),
        }
    }
}

impl ParallelizerConfig {
    pub fn new(num_parallel: usize) -> Self {
        Self {
            num_parallel,
            ..Self::default()
        }
    }

    pub fn with_publish(mut self, publish: PublishPolicy) -> Self {
        self.publish = publish;
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.num_parallel == 0 {
            return Err(CoreError::Config("numParallel must be at least 1".into()));
        }
        self.publish.validate()?;
        Ok(())
    }
}

/// Driver side of a parallelizer: where commands go in and results come out.
pub struct DriverChannels {
    pub commands: CommandSender,
    pub results: mpsc::UnboundedReceiver<JobResult>,
}

impl DriverChannels {
    /// Send a command, waiting until the previous one has been consumed.
    pub async fn send(&self, cmd: Command) -> Result<(), CommandSendError> {
        self.commands.send(cmd).await
    }

    /// Next published result; `None` once the parallelizer and all its jobs are gone.
    pub async fn recv(&mut self) -> Option<JobResult> {
        self.results.recv().await
    }
}

/// The coordinator. Consume it with [`Parallelizer::run`] or [`Parallelizer::spawn`].
pub struct Parallelizer {
    shared: Arc<Shared>,
    commands: CommandReceiver,
}

impl Parallelizer {
    /// Create a parallelizer publishing into an unbounded in-process channel.
    pub fn new(cfg: ParallelizerConfig, ctx: JobContext) -> Result<(Self, DriverChannels), CoreError> {
        let (results_tx, results) = mpsc::unbounded_channel();
        let (parallelizer, commands) = Self::with_sink(cfg, ctx, Arc::new(results_tx))?;
        Ok((parallelizer, DriverChannels { commands, results }))
    }

    /// Create a parallelizer publishing into a custom sink.
    pub fn with_sink(
        cfg: ParallelizerConfig,
        ctx: JobContext,
        sink: Arc<dyn ResultSink>,
    ) -> Result<(Self, CommandSender), CoreError> {
        cfg.validate()?;
        let (commands_tx, commands) = command_channel();
        let shared = Arc::new(Shared::new(
            GenerationGuard::new(cfg.num_parallel),
            commands.peek(),
            sink,
            ctx,
            cfg.publish,
        ));
        Ok((Self { shared, commands }, commands_tx))
    }

    /// Read-only view of the bookkeeping.
    ///
    /// A live probe keeps the result sink open.
    pub fn probe(&self) -> ParallelizerProbe {
        ParallelizerProbe {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Run the loop on a new tokio task.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<Result<(), CoreError>> {
        tokio::spawn(self.run(shutdown))
    }

    /// Consume commands until the sender is dropped, `shutdown` fires, the driver breaks
    /// the protocol or a result could not be published.
    ///
    /// Every exit cancels the in-flight jobs; every error exit also tries to hand the
    /// driver a final coordinator failure so it is not left waiting.
    #[instrument(
        level = "info",
        name = "parallelizer",
        skip_all,
        fields(num_parallel = self.shared.num_parallel())
    )]
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), CoreError> {
        info!("parallelizer started");

        let res = self.consume(&shutdown).await;
        self.shared.shutdown_pool().await;

        match &res {
            Ok(()) => info!("command channel closed; parallelizer stopped"),
            Err(e) => {
                error!(error = %e, "parallelizer loop terminated");
                self.shared.deliver_fatal(e).await;
            }
        }
        res
    }

    async fn consume(&mut self, shutdown: &CancellationToken) -> Result<(), CoreError> {
        loop {
            let cmd = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Err(CoreError::Interrupted),
                _ = self.shared.fatal().cancelled() => {
                    return Err(CoreError::PublishExhausted {
                        attempts: self.shared.publish_policy().max_attempts.unwrap_or(0),
                    });
                }
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => cmd,
                    None => return Ok(()),
                },
            };

            match cmd {
                Command::StartK { units, generation } => {
                    self.shared.start_k(units, generation).await?;
                }
                Command::StartOne { unit, generation } => {
                    self.shared.start_one(unit, generation).await?;
                }
                Command::StopAll { generation } => self.shared.stop_all(generation).await?,
            }
        }
    }
}

/// Observer for tests and drivers; see [`Parallelizer::probe`].
#[derive(Clone)]
pub struct ParallelizerProbe {
    shared: Arc<Shared>,
}

impl ParallelizerProbe {
    /// Generation and running count, read under the shared side of the guard.
    pub async fn snapshot(&self) -> GuardSnapshot {
        self.shared.snapshot().await
    }
}
