//! Scripts, trees and zones assembled from a [`RunConfig`].

use std::path::Path;
use std::sync::Arc;

use ai_bt::AiRegistry;
use ai_core::{Agent, BasicCharacter, Character, Vec3};
use ai_lua::{LuaAiRegistry, LuaTreeLoader, ScriptKind};
use ai_zone::Zone;
use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, info};

use crate::config::{RunConfig, ZoneSpec};

/// Everything the runner ticks. Agent ids are unique across zones and start at 1.
#[derive(Debug)]
pub struct World {
    scripts: LuaAiRegistry,
    trees: LuaTreeLoader,
    zones: Vec<Arc<Zone>>,
    next_agent: i64,
}

impl World {
    /// Evaluates the scripts, builds the trees and spawns the agents of every zone.
    pub fn load(config: &RunConfig) -> Result<Self> {
        let registry = Arc::new(AiRegistry::new());
        let scripts = LuaAiRegistry::new(Arc::clone(&registry));
        ensure!(scripts.init(), "failed to start the script runtime");
        for path in &config.scripts {
            let source = read_script(path)?;
            scripts
                .try_evaluate(&chunk_name(path), &source)
                .with_context(|| format!("Failed to evaluate {}", path.display()))?;
        }

        let trees = LuaTreeLoader::new(registry);
        for path in &config.trees {
            let source = read_script(path)?;
            if !trees.init_named(&chunk_name(path), &source) {
                bail!("Failed to load trees from {}: {}", path.display(), trees.error());
            }
        }
        info!(
            nodes = scripts.script_types(ScriptKind::Node).len(),
            conditions = scripts.script_types(ScriptKind::Condition).len(),
            trees = ?trees.names(),
            "scripts loaded"
        );

        let mut world = Self {
            scripts,
            trees,
            zones: Vec::new(),
            next_agent: 1,
        };
        for spec in &config.zones {
            world.spawn_zone(spec)?;
        }
        Ok(world)
    }

    fn spawn_zone(&mut self, spec: &ZoneSpec) -> Result<()> {
        let name = &spec.zone.name;
        let tree = self
            .trees
            .load(&spec.tree)
            .ok_or_else(|| anyhow!("zone {name} uses unknown tree {}", spec.tree))?;
        let zone = Zone::from_config(&spec.zone);
        for _ in 0..spec.agents {
            let id = self.next_agent;
            self.next_agent += 1;
            let character = BasicCharacter::new(id);
            character.set_position(Vec3::new(id as f32, 0.0, 0.0));
            zone.add_agent(Arc::new(
                Agent::new(Arc::new(character)).with_behaviour(tree.clone()),
            ));
        }
        debug!(zone = %name, tree = %spec.tree, agents = spec.agents, "zone spawned");
        self.zones.push(zone);
        Ok(())
    }

    pub fn zones(&self) -> &[Arc<Zone>] {
        &self.zones
    }

    pub fn tree_names(&self) -> Vec<String> {
        self.trees.names()
    }

    pub fn scripts(&self) -> &LuaAiRegistry {
        &self.scripts
    }

    /// One tick of every zone.
    pub fn update(&self, delta_millis: i64) {
        for zone in &self.zones {
            zone.update(delta_millis);
        }
    }
}

fn read_script(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))
}

fn chunk_name(path: &Path) -> String {
    format!("@{}", path.display())
}
