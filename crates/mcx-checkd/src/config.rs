use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, bail, ensure};
use serde::{Deserialize, Serialize};

use mcx_core::ParallelizerConfig;
use mcx_exec::subprocess::SubprocessVerifierConfig;
use mcx_model::{CheckableUnit, Invariant, ModelSource, PublishPolicy};
use mcx_observe::LoggerConfig;

/// Which coordinator drives the units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every unit is checked; results stream back as they finish.
    #[default]
    Pipeline,
    /// First success among the first `numParallel` units wins.
    Race,
}

/// One invariant to check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitConfig {
    pub invariant: Invariant,
    #[serde(default = "default_unit_timeout_secs")]
    pub timeout_secs: u64,
    /// Inline model template; overrides the top-level model.
    #[serde(default)]
    pub model: Option<String>,
    /// Model template file, relative to the config file; overrides the top-level model.
    #[serde(default)]
    pub model_path: Option<PathBuf>,
}

fn default_unit_timeout_secs() -> u64 {
    60
}

/// Daemon configuration, read from the JSON file given as the first argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckdConfig {
    pub logger: LoggerConfig,
    pub mode: Mode,
    pub num_parallel: usize,
    /// Race mode only.
    pub batch_timeout_secs: u64,
    pub publish: PublishPolicy,
    pub verifier: SubprocessVerifierConfig,
    /// Default inline model template for units without their own.
    pub model: Option<String>,
    /// Default model template file for units without their own.
    pub model_path: Option<PathBuf>,
    /// Log the Prometheus exposition on exit.
    pub print_metrics: bool,
    pub units: Vec<UnitConfig>,
}

impl Default for CheckdConfig {
    fn default() -> Self {
        Self {
            logger: LoggerConfig::default(),
            mode: Mode::default(),
            num_parallel: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            batch_timeout_secs: 600,
            publish: PublishPolicy::default(),
            verifier: SubprocessVerifierConfig::default(),
            model: None,
            model_path: None,
            print_metrics: false,
            units: Vec::new(),
        }
    }
}

impl CheckdConfig {
    /// Read and validate `path`; relative model paths resolve against its directory.
    pub fn load(path: &Path) -> anyhow::Result<(Self, PathBuf)> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.validate()?;

        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((cfg, base))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.parallelizer().validate()?;
        self.verifier.validate()?;
        ensure!(self.batch_timeout_secs > 0, "batchTimeoutSecs must be positive");
        ensure!(!self.units.is_empty(), "no units configured");
        for unit in &self.units {
            ensure!(
                unit.timeout_secs > 0,
                "timeoutSecs must be positive for '{}'",
                unit.invariant
            );
        }
        Ok(())
    }

    pub fn parallelizer(&self) -> ParallelizerConfig {
        ParallelizerConfig::new(self.num_parallel).with_publish(self.publish.clone())
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    /// Resolve every unit's model and build the checkable units, in config order.
    pub fn checkable_units(&self, base: &Path) -> anyhow::Result<Vec<CheckableUnit>> {
        let default = match (&self.model, &self.model_path) {
            (Some(text), _) => Some(ModelSource::from(text.as_str())),
            (None, Some(path)) => Some(read_model(base, path)?),
            (None, None) => None,
        };

        self.units
            .iter()
            .map(|unit| {
                let model = match (&unit.model, &unit.model_path, &default) {
                    (Some(text), _, _) => ModelSource::from(text.as_str()),
                    (None, Some(path), _) => read_model(base, path)?,
                    (None, None, Some(model)) => model.clone(),
                    (None, None, None) => bail!("no model for '{}'", unit.invariant),
                };
                Ok(CheckableUnit::new(
                    model,
                    unit.invariant.clone(),
                    Duration::from_secs(unit.timeout_secs),
                ))
            })
            .collect()
    }
}

fn read_model(base: &Path, path: &Path) -> anyhow::Result<ModelSource> {
    let full = base.join(path);
    let text = fs::read_to_string(&full)
        .with_context(|| format!("reading model {}", full.display()))?;
    Ok(ModelSource::from(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "mode": "race",
        "numParallel": 2,
        "batchTimeoutSecs": 30,
        "model": "system {{invariant}}",
        "verifier": { "program": "verify", "args": ["{input}"] },
        "units": [
            { "invariant": "send AFby recv" },
            { "invariant": "open AP close", "timeoutSecs": 5, "model": "other {{first}}" }
        ]
    }"#;

    #[test]
    fn parses_and_resolves_units() {
        let cfg: CheckdConfig = serde_json::from_str(SAMPLE).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.mode, Mode::Race);
        assert_eq!(cfg.batch_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.publish, PublishPolicy::default());

        let units = cfg.checkable_units(Path::new(".")).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].model().as_str(), "system {{invariant}}");
        assert_eq!(units[0].timeout(), Duration::from_secs(60));
        assert_eq!(units[1].model().as_str(), "other {{first}}");
        assert_eq!(units[1].invariant().to_string(), "open AP close");
    }

    #[test]
    fn unit_without_any_model_is_rejected() {
        let mut cfg: CheckdConfig = serde_json::from_str(SAMPLE).unwrap();
        cfg.model = None;
        assert!(cfg.checkable_units(Path::new(".")).is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut cfg: CheckdConfig = serde_json::from_str(SAMPLE).unwrap();
        cfg.num_parallel = 0;
        assert!(cfg.validate().is_err());

        let mut cfg: CheckdConfig = serde_json::from_str(SAMPLE).unwrap();
        cfg.units.clear();
        assert!(cfg.validate().is_err());

        assert!(serde_json::from_str::<CheckdConfig>(r#"{"units": [{"invariant": "a XX b"}]}"#).is_err());
    }

    #[test]
    fn shipped_config_parses() {
        let raw = include_str!("../config/checkd.json");
        let cfg: CheckdConfig = serde_json::from_str(raw).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.mode, Mode::Pipeline);
        assert!(cfg.verifier.uses_input_file());
    }
}
