//! Native wrappers around script-defined types.

use core::fmt;
use std::sync::{Arc, Weak};

use ai_core::{
    AgentId, AgentPtr, Condition, Filter, MoveVector, NodeBase, Steering, TickContext, TreeNode,
    TreeNodePtr, TreeNodeStatus, Vec3,
};
use mlua::{FromLuaMulti, Function, RegistryKey, Table, Value};
use tracing::warn;

use crate::runtime::ScriptRuntime;
use crate::userdata::LuaAgent;
use crate::LuaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScriptKind {
    Node,
    Condition,
    Filter,
    Steering,
}

impl ScriptKind {
    /// Name used in `tostring` and error messages.
    pub fn label(self) -> &'static str {
        match self {
            ScriptKind::Node => "node",
            ScriptKind::Condition => "condition",
            ScriptKind::Filter => "filter",
            ScriptKind::Steering => "steering",
        }
    }

    /// The method a script has to define on the type table.
    pub fn method(self) -> &'static str {
        match self {
            ScriptKind::Node | ScriptKind::Steering => "execute",
            ScriptKind::Condition => "evaluate",
            ScriptKind::Filter => "filter",
        }
    }

    pub(crate) fn duplicate_message(self, name: &str) -> String {
        match self {
            ScriptKind::Node => format!("tree node {name} is already registered"),
            kind => format!("{} {name} is already registered", kind.label()),
        }
    }
}

/// The type table a script got back from `REGISTRY.create*`, pinned in the Lua registry.
///
/// Shared by the factory and every instance it created. The registry slot is released when
/// the last of them is dropped.
pub struct ScriptType {
    kind: ScriptKind,
    name: String,
    key: RegistryKey,
}

impl ScriptType {
    pub(crate) fn new(kind: ScriptKind, name: String, key: RegistryKey) -> Self {
        Self { kind, name, key }
    }

    pub fn kind(&self) -> ScriptKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls `type:<method>(ai, arg)`.
    fn call<R: FromLuaMulti>(
        &self,
        runtime: &Weak<ScriptRuntime>,
        agent: &AgentPtr,
        arg: Value,
    ) -> Result<R, LuaError> {
        let runtime = runtime.upgrade().ok_or(LuaError::Shutdown)?;
        runtime.with(|lua| {
            let table: Table = lua.registry_value(&self.key)?;
            let method: Function = table.get(self.kind.method())?;
            let ai = lua.create_userdata(LuaAgent::new(Arc::clone(agent)))?;
            method.call::<R>((table, ai, arg))
        })
    }

    fn report(&self, agent: &AgentPtr, err: &LuaError) {
        warn!(
            kind = self.kind.label(),
            name = %self.name,
            agent = %agent.id(),
            error = %err,
            "script call failed"
        );
    }
}

impl fmt::Debug for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptType")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish()
    }
}

/// Tree node whose `execute` is `node:execute(ai, deltaMillis)` in Lua.
///
/// Any script error counts as [`TreeNodeStatus::Failed`].
pub struct LuaTreeNode {
    base: NodeBase,
    children: Vec<TreeNodePtr>,
    script: Arc<ScriptType>,
    runtime: Weak<ScriptRuntime>,
}

impl LuaTreeNode {
    pub fn new(
        base: NodeBase,
        children: Vec<TreeNodePtr>,
        script: Arc<ScriptType>,
        runtime: Weak<ScriptRuntime>,
    ) -> Self {
        Self {
            base,
            children,
            script,
            runtime,
        }
    }
}

impl TreeNode for LuaTreeNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn children(&self) -> &[TreeNodePtr] {
        &self.children
    }

    fn execute(&self, ctx: &mut TickContext<'_>) -> TreeNodeStatus {
        if !self.base.can_execute(ctx.agent) {
            return TreeNodeStatus::CannotExecute;
        }
        let status = match self.script.call::<i64>(
            &self.runtime,
            ctx.agent,
            Value::Integer(ctx.delta_millis),
        ) {
            Ok(code) => TreeNodeStatus::from_code(code),
            Err(err) => {
                self.script.report(ctx.agent, &err);
                TreeNodeStatus::Failed
            }
        };
        self.base.record(ctx, status)
    }
}

pub struct LuaCondition {
    parameters: String,
    script: Arc<ScriptType>,
    runtime: Weak<ScriptRuntime>,
}

impl LuaCondition {
    pub fn new(parameters: String, script: Arc<ScriptType>, runtime: Weak<ScriptRuntime>) -> Self {
        Self {
            parameters,
            script,
            runtime,
        }
    }
}

impl Condition for LuaCondition {
    fn name(&self) -> &str {
        self.script.name()
    }

    fn parameters(&self) -> &str {
        &self.parameters
    }

    fn evaluate(&self, agent: &AgentPtr) -> bool {
        self.script
            .call::<bool>(&self.runtime, agent, Value::Nil)
            .unwrap_or_else(|err| {
                self.script.report(agent, &err);
                false
            })
    }
}

/// Appends the ids returned by `filter:filter(ai)` to the agent's filtered list.
pub struct LuaFilter {
    parameters: String,
    script: Arc<ScriptType>,
    runtime: Weak<ScriptRuntime>,
}

impl LuaFilter {
    pub fn new(parameters: String, script: Arc<ScriptType>, runtime: Weak<ScriptRuntime>) -> Self {
        Self {
            parameters,
            script,
            runtime,
        }
    }
}

impl Filter for LuaFilter {
    fn name(&self) -> &str {
        self.script.name()
    }

    fn parameters(&self) -> &str {
        &self.parameters
    }

    fn filter(&self, agent: &AgentPtr) {
        match self
            .script
            .call::<Option<Vec<i64>>>(&self.runtime, agent, Value::Nil)
        {
            Ok(ids) => {
                for id in ids.unwrap_or_default() {
                    agent.add_filtered_entity(AgentId(id));
                }
            }
            Err(err) => self.script.report(agent, &err),
        }
    }
}

/// `steering:execute(ai, speed)` returning `x, y, z, rotation`.
pub struct LuaSteering {
    script: Arc<ScriptType>,
    runtime: Weak<ScriptRuntime>,
}

impl LuaSteering {
    pub fn new(script: Arc<ScriptType>, runtime: Weak<ScriptRuntime>) -> Self {
        Self { script, runtime }
    }
}

impl Steering for LuaSteering {
    fn name(&self) -> &str {
        self.script.name()
    }

    fn execute(&self, agent: &AgentPtr, speed: f32) -> MoveVector {
        match self.script.call::<(f32, f32, f32, Option<f32>)>(
            &self.runtime,
            agent,
            Value::Number(f64::from(speed)),
        ) {
            Ok((x, y, z, rotation)) => MoveVector::new(Vec3::new(x, y, z), rotation.unwrap_or(0.0)),
            Err(err) => {
                self.script.report(agent, &err);
                MoveVector::default()
            }
        }
    }
}
