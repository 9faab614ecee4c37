mod config;
mod pipeline;
mod race;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mcx_core::{JobContext, MetricsHandle, TemplateBuilder};
use mcx_exec::subprocess::SubprocessVerifier;
use mcx_observe::{LoggerTimeZone, init_local_offset, init_logger};
use mcx_prometheus::{Encoder, PrometheusMetrics, TextEncoder};

use config::{CheckdConfig, Mode};

fn main() -> anyhow::Result<()> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: mcx-checkd <config.json>")?;
    let (mut cfg, base) = CheckdConfig::load(&path)?;
    cfg.logger = cfg.logger.overlay_env()?;

    // Offset detection needs to happen before the runtime spawns threads.
    if cfg.logger.tz == LoggerTimeZone::Local {
        init_local_offset();
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cfg, base))
}

async fn run(cfg: CheckdConfig, base: PathBuf) -> anyhow::Result<()> {
    init_logger(&cfg.logger)?;
    info!(mode = ?cfg.mode, num_parallel = cfg.num_parallel, units = cfg.units.len(), "mcx-checkd starting");

    let units = cfg.checkable_units(&base)?;
    let metrics = PrometheusMetrics::new()?;
    let handle: MetricsHandle = Arc::new(metrics.clone());
    let verifier = SubprocessVerifier::new(cfg.verifier.clone())?;
    info!(verifier = %verifier.config(), "verifier ready");
    let ctx = JobContext::new(Arc::new(verifier), Arc::new(TemplateBuilder::new()))
        .with_metrics(handle);

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping");
            on_signal.cancel();
        }
    });

    let res = match cfg.mode {
        Mode::Pipeline => pipeline::run(cfg.parallelizer(), ctx, units, shutdown)
            .await
            .map(|tally| info!(?tally, "all units checked")),
        Mode::Race => {
            let race = race::run(cfg.num_parallel, ctx, &units, cfg.batch_timeout());
            tokio::select! {
                res = race => res.map(|report| info!(
                    winner = %report.winner,
                    verdict = ?report.outcome.verdict,
                    attempted = report.attempted.len(),
                    "race won"
                )),
                _ = shutdown.cancelled() => Err(anyhow::anyhow!("interrupted")),
            }
        }
    };

    if cfg.print_metrics {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&metrics.gather(), &mut buf)?;
        info!("metrics:\n{}", String::from_utf8_lossy(&buf));
    }
    if let Err(e) = &res {
        error!(error = %format!("{e:#}"), "mcx-checkd failed");
    }
    res
}
