use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::helper::StatsHelper;
use crate::ident::IdentifierLevel;
use crate::output::OutputType;

/// Top-level configuration for a statistics installation.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Logging verbosity (debug, info, warn, error). Default: "info".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// One entry per statistic helper to configure.
    #[serde(default)]
    pub stats: Vec<StatsConfig>,
}

/// The named options of one statistic helper.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    /// Display label; also seeds collector and output naming.
    pub name: String,

    /// Grouping granularity. Effective only before installation.
    #[serde(default)]
    pub identifier: IdentifierLevel,

    /// Rendering/persistence mode. Effective only before installation.
    #[serde(default)]
    pub output: OutputType,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Loads and validates a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&data).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(data: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates the configuration for required fields and consistency.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for stat in &self.stats {
            if stat.name.is_empty() {
                bail!("stats entries require a non-empty name");
            }
            if !names.insert(stat.name.as_str()) {
                bail!("duplicate stats entry name: {}", stat.name);
            }
        }
        Ok(())
    }
}

impl StatsConfig {
    /// Applies the three named options to a helper.
    ///
    /// Subject to the helper's lifecycle contract: applying after the helper
    /// is installed has no effect.
    pub fn apply(&self, helper: &mut StatsHelper) {
        helper.set_name(&self.name);
        helper.set_identifier_level(self.identifier);
        helper.set_output_type(self.output);
    }
}
