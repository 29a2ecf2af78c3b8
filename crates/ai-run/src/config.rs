//! Runner configuration, loaded from a YAML file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ai_debug::DebugServerConfig;
use ai_zone::ZoneConfig;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// What to load and how to tick it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Scripts registering node, condition, filter and steering types.
    pub scripts: Vec<PathBuf>,

    /// Scripts declaring trees through `AI.createTree`.
    pub trees: Vec<PathBuf>,

    pub zones: Vec<ZoneSpec>,

    /// Milliseconds advanced per tick
    #[serde(default = "default_tick_millis")]
    pub tick_millis: i64,

    pub debug: DebugServerConfig,
}

/// One zone and the agents spawned into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSpec {
    #[serde(flatten)]
    pub zone: ZoneConfig,

    /// Tree every agent of the zone runs
    pub tree: String,

    #[serde(default = "default_agents")]
    pub agents: usize,
}

fn default_tick_millis() -> i64 {
    100
}
fn default_agents() -> usize {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scripts: Vec::new(),
            trees: Vec::new(),
            zones: Vec::new(),
            tick_millis: default_tick_millis(),
            debug: DebugServerConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Resolve script paths relative to `base`, usually the config file's directory.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in self.scripts.iter_mut().chain(self.trees.iter_mut()) {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.tick_millis > 0, "tick_millis must be positive, got {}", self.tick_millis);
        let mut names = BTreeSet::new();
        for spec in &self.zones {
            ensure!(
                names.insert(spec.zone.name.as_str()),
                "zone {} is configured twice",
                spec.zone.name
            );
            ensure!(spec.zone.threads > 0, "zone {} needs at least one thread", spec.zone.name);
        }
        Ok(())
    }
}
