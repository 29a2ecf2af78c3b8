use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use ai_bt::{
    AiRegistry, ConditionFactoryContext, FilterFactoryContext, SteeringFactoryContext,
    TreeNodeFactoryContext,
};
use ai_core::{ConditionPtr, Factory, FactoryError, FilterPtr, SteeringPtr, TreeNodePtr, Vec3};
use mlua::{Lua, MultiValue, Table};
use tracing::{debug, warn};

use crate::runtime::ScriptRuntime;
use crate::script::{LuaCondition, LuaFilter, LuaSteering, LuaTreeNode, ScriptKind, ScriptType};
use crate::userdata::LuaVec;
use crate::LuaError;

const STATUS_GLOBALS: &str =
    "UNKNOWN, CANNOTEXECUTE, RUNNING, FINISHED, FAILED, EXCEPTION = 0, 1, 2, 3, 4, 5\n";

type ScriptTypes = Arc<Mutex<BTreeSet<(ScriptKind, String)>>>;

/// An [`AiRegistry`] that scripts can extend.
///
/// Scripts declare types through the global `REGISTRY` table:
///
/// ```lua
/// local wander = REGISTRY.createNode("Wander")
/// function wander:execute(ai, deltaMillis)
///     return RUNNING
/// end
/// ```
///
/// Each `create*` call registers a factory under that name; instances created from it are
/// native wrappers calling back into the script. [`LuaAiRegistry::shutdown`] unregisters
/// all of them again and closes the Lua state. A global `vec(x, y, z)` builds vectors for
/// `character:setPosition`.
#[derive(Debug)]
pub struct LuaAiRegistry {
    registry: Arc<AiRegistry>,
    runtime: Arc<ScriptRuntime>,
    types: ScriptTypes,
}

impl LuaAiRegistry {
    /// Wraps `registry`. Call [`LuaAiRegistry::init`] before evaluating scripts.
    pub fn new(registry: Arc<AiRegistry>) -> Self {
        Self {
            registry,
            runtime: Arc::new(ScriptRuntime::new()),
            types: Arc::default(),
        }
    }

    pub fn registry(&self) -> &Arc<AiRegistry> {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_running()
    }

    /// Starts the Lua state and installs `REGISTRY` and the status globals. Returns `true`
    /// if the state is (already) running.
    pub fn init(&self) -> bool {
        let registry = Arc::downgrade(&self.registry);
        let runtime = Arc::downgrade(&self.runtime);
        let types = Arc::clone(&self.types);
        let result = self
            .runtime
            .start(|lua| install_globals(lua, registry, runtime, types));
        match result {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to start script runtime");
                false
            }
        }
    }

    /// [`LuaAiRegistry::init`] followed by [`LuaAiRegistry::evaluate`].
    pub fn init_with(&self, source: &str) -> bool {
        self.init() && self.evaluate(source)
    }

    /// Runs a script. Errors are logged and reported as `false`.
    pub fn evaluate(&self, source: &str) -> bool {
        self.evaluate_named("=script", source)
    }

    /// Like [`LuaAiRegistry::evaluate`], with `name` showing up in error messages.
    pub fn evaluate_named(&self, name: &str, source: &str) -> bool {
        match self.try_evaluate(name, source) {
            Ok(()) => true,
            Err(err) => {
                warn!(script = name, error = %err, "script evaluation failed");
                false
            }
        }
    }

    pub fn try_evaluate(&self, name: &str, source: &str) -> Result<(), LuaError> {
        self.runtime
            .with(|lua| lua.load(source).set_name(name).exec())
    }

    /// Unregisters every script type and closes the Lua state. Wrappers created earlier stay
    /// valid but report failure from then on.
    pub fn shutdown(&self) {
        let types = std::mem::take(&mut *self.types.lock().unwrap_or_else(PoisonError::into_inner));
        for (kind, name) in &types {
            match kind {
                ScriptKind::Node => self.registry.unregister_node_factory(name),
                ScriptKind::Condition => self.registry.unregister_condition_factory(name),
                ScriptKind::Filter => self.registry.unregister_filter_factory(name),
                ScriptKind::Steering => self.registry.unregister_steering_factory(name),
            };
        }
        if self.runtime.stop() {
            debug!(types = types.len(), "script registry shut down");
        }
    }

    /// Full collection of the Lua heap.
    pub fn gc_collect(&self) -> Result<(), LuaError> {
        self.runtime.gc_collect()
    }

    /// Names of the script-defined types of `kind`, sorted.
    pub fn script_types(&self, kind: ScriptKind) -> Vec<String> {
        self.types
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn create_node(
        &self,
        type_name: &str,
        ctx: &TreeNodeFactoryContext,
    ) -> Option<TreeNodePtr> {
        if ctx.type_name == type_name {
            return self.registry.create_node(ctx);
        }
        let ctx = TreeNodeFactoryContext {
            type_name: type_name.to_string(),
            ..ctx.clone()
        };
        self.registry.create_node(&ctx)
    }

    pub fn create_condition(
        &self,
        type_name: &str,
        ctx: &ConditionFactoryContext,
    ) -> Option<ConditionPtr> {
        self.registry.create_condition(type_name, ctx)
    }

    pub fn create_filter(&self, type_name: &str, ctx: &FilterFactoryContext) -> Option<FilterPtr> {
        self.registry.create_filter(type_name, ctx)
    }

    pub fn create_steering(
        &self,
        type_name: &str,
        ctx: &SteeringFactoryContext,
    ) -> Option<SteeringPtr> {
        self.registry.create_steering(type_name, ctx)
    }
}

impl Drop for LuaAiRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn install_globals(
    lua: &Lua,
    registry: Weak<AiRegistry>,
    runtime: Weak<ScriptRuntime>,
    types: ScriptTypes,
) -> mlua::Result<()> {
    let table = lua.create_table()?;
    for (function, kind) in [
        ("createNode", ScriptKind::Node),
        ("createCondition", ScriptKind::Condition),
        ("createFilter", ScriptKind::Filter),
        ("createSteering", ScriptKind::Steering),
    ] {
        let registry = registry.clone();
        let runtime = runtime.clone();
        let types = Arc::clone(&types);
        let create = lua.create_function(move |lua, name: String| {
            create_type(lua, kind, name, &registry, &runtime, &types)
        })?;
        table.set(function, create)?;
    }
    lua.globals().set("REGISTRY", table)?;
    lua.globals().set(
        "vec",
        lua.create_function(|_, (x, y, z): (Option<f32>, Option<f32>, Option<f32>)| {
            Ok(LuaVec(Vec3::new(
                x.unwrap_or_default(),
                y.unwrap_or_default(),
                z.unwrap_or_default(),
            )))
        })?,
    )?;
    lua.load(STATUS_GLOBALS).set_name("=status").exec()
}

/// Builds the type table for `REGISTRY.create*` and registers the matching factory.
fn create_type(
    lua: &Lua,
    kind: ScriptKind,
    name: String,
    registry: &Weak<AiRegistry>,
    runtime: &Weak<ScriptRuntime>,
    types: &ScriptTypes,
) -> mlua::Result<Table> {
    let registry = registry
        .upgrade()
        .ok_or_else(|| mlua::Error::external("registry is gone"))?;
    if is_registered(&registry, kind, &name) {
        return Err(mlua::Error::external(kind.duplicate_message(&name)));
    }

    let table = lua.create_table()?;
    table.set("type", name.as_str())?;

    let defaults = lua.create_table()?;
    let missing = format!(
        "There is no {} function set for {}: {name}",
        kind.method(),
        kind.label()
    );
    defaults.set(
        kind.method(),
        lua.create_function(move |_, _: MultiValue| -> mlua::Result<()> {
            Err(mlua::Error::external(missing.clone()))
        })?,
    )?;

    let meta = lua.create_table()?;
    meta.set("__index", defaults)?;
    meta.set("__name", kind.label())?;
    let text = format!("{}: {name}", kind.label());
    meta.set(
        "__tostring",
        lua.create_function(move |_, _: Table| Ok(text.clone()))?,
    )?;
    table.set_metatable(Some(meta));

    let script = Arc::new(ScriptType::new(
        kind,
        name.clone(),
        lua.create_registry_value(table.clone())?,
    ));
    if !register(&registry, kind, &name, script, runtime.clone()) {
        return Err(mlua::Error::external(kind.duplicate_message(&name)));
    }
    types
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert((kind, name.clone()));
    debug!(kind = kind.label(), name = %name, "script type registered");
    Ok(table)
}

fn is_registered(registry: &AiRegistry, kind: ScriptKind, name: &str) -> bool {
    match kind {
        ScriptKind::Node => registry.nodes().contains(name),
        ScriptKind::Condition => registry.conditions().contains(name),
        ScriptKind::Filter => registry.filters().contains(name),
        ScriptKind::Steering => registry.steerings().contains(name),
    }
}

fn register(
    registry: &AiRegistry,
    kind: ScriptKind,
    name: &str,
    script: Arc<ScriptType>,
    runtime: Weak<ScriptRuntime>,
) -> bool {
    match kind {
        ScriptKind::Node => {
            let factory: Arc<dyn Factory<TreeNodePtr, TreeNodeFactoryContext>> =
                Arc::new(move |ctx: &TreeNodeFactoryContext| -> Result<TreeNodePtr, FactoryError> {
                    Ok(Arc::new(LuaTreeNode::new(
                        ctx.base(),
                        ctx.children.clone(),
                        Arc::clone(&script),
                        runtime.clone(),
                    )))
                });
            registry.register_node_factory(name, factory)
        }
        ScriptKind::Condition => {
            let factory: Arc<dyn Factory<ConditionPtr, ConditionFactoryContext>> = Arc::new(
                move |ctx: &ConditionFactoryContext| -> Result<ConditionPtr, FactoryError> {
                    Ok(Arc::new(LuaCondition::new(
                        ctx.parameters.clone(),
                        Arc::clone(&script),
                        runtime.clone(),
                    )))
                },
            );
            registry.register_condition_factory(name, factory)
        }
        ScriptKind::Filter => {
            let factory: Arc<dyn Factory<FilterPtr, FilterFactoryContext>> =
                Arc::new(move |ctx: &FilterFactoryContext| -> Result<FilterPtr, FactoryError> {
                    Ok(Arc::new(LuaFilter::new(
                        ctx.parameters.clone(),
                        Arc::clone(&script),
                        runtime.clone(),
                    )))
                });
            registry.register_filter_factory(name, factory)
        }
        ScriptKind::Steering => {
            let factory: Arc<dyn Factory<SteeringPtr, SteeringFactoryContext>> =
                Arc::new(move |_ctx: &SteeringFactoryContext| -> Result<SteeringPtr, FactoryError> {
                    Ok(Arc::new(LuaSteering::new(Arc::clone(&script), runtime.clone())))
                });
            registry.register_steering_factory(name, factory)
        }
    }
}
