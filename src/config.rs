use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

pub const DATA_DIR_VAR: &str = "YA_DATA_DIR";
pub const SUBMIT_DELAY_VAR: &str = "YA_SUBMIT_DELAY_MS";
pub const DEFAULT_SUBMIT_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding batches.csv, levels.json and members.json.
    /// Built-in seed data is used when unset.
    pub data_dir: Option<PathBuf>,
    pub submit_delay: Duration,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let data_dir = lookup(DATA_DIR_VAR)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let delay_ms = match lookup(SUBMIT_DELAY_VAR) {
            Some(raw) => raw.trim().parse::<u64>().with_context(|| {
                format!("{SUBMIT_DELAY_VAR} must be a whole number of milliseconds, got {raw:?}")
            })?,
            None => DEFAULT_SUBMIT_DELAY_MS,
        };

        Ok(Self {
            data_dir,
            submit_delay: Duration::from_millis(delay_ms),
        })
    }

    /// Command-line flags win over the environment.
    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, delay_ms: Option<u64>) -> Self {
        if data_dir.is_some() {
            self.data_dir = data_dir;
        }
        if let Some(ms) = delay_ms {
            self.submit_delay = Duration::from_millis(ms);
        }
        self
    }
}
