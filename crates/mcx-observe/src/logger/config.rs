use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::logger::{
    error::LoggerResult,
    object::{LoggerFormat, LoggerLevel, LoggerTimeZone},
};

/// Filter expression override, e.g. `MCX_LOG=mcx_core=debug,info`.
pub const ENV_LEVEL: &str = "MCX_LOG";
/// Output format override: `text`, `json` or `journald`.
pub const ENV_FORMAT: &str = "MCX_LOG_FORMAT";
/// Timestamp timezone override: `utc` or `local`.
pub const ENV_TZ: &str = "MCX_LOG_TZ";

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` expression (e.g. `"info"`, `"mcx_core=trace,info"`).
    pub level: LoggerLevel,
    pub tz: LoggerTimeZone,
    /// Include module targets in text/json output.
    pub with_targets: bool,
    /// Colored text output; ignored when stdout is not a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Defaults overlaid with `MCX_LOG`, `MCX_LOG_FORMAT` and `MCX_LOG_TZ`.
    pub fn from_env() -> LoggerResult<Self> {
        Self::default().overlay_env()
    }

    /// Apply the environment overrides on top of `self`.
    pub fn overlay_env(self) -> LoggerResult<Self> {
        self.overlay_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`; blank values are ignored.
    pub fn overlay_with<F>(mut self, lookup: F) -> LoggerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());

        if let Some(level) = get(ENV_LEVEL) {
            self.level = level.parse()?;
        }
        if let Some(format) = get(ENV_FORMAT) {
            self.format = format.parse()?;
        }
        if let Some(tz) = get(ENV_TZ) {
            self.tz = tz.parse()?;
        }
        Ok(self)
    }

    /// `use_color` and stdout is a terminal. Evaluate at init time, not at parse time.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}
