use core::fmt;
use std::sync::Arc;

use ai_core::{FactoryError, NodeBase, TickContext, TreeNode, TreeNodeStatus};
use tracing::info;

/// Stays `Running` for the configured number of milliseconds of agent time.
pub struct Idle {
    base: NodeBase,
    millis: i64,
}

impl Idle {
    pub fn new(base: NodeBase) -> Result<Self, FactoryError> {
        let millis = base
            .parameters()
            .trim()
            .parse::<i64>()
            .map_err(|_| FactoryError::InvalidParameters {
                parameters: base.parameters().to_string(),
                reason: "expected the idle time in milliseconds".to_string(),
            })?;
        Ok(Self { base, millis })
    }

    pub fn millis(&self) -> i64 {
        self.millis
    }
}

impl TreeNode for Idle {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn execute(&self, ctx: &mut TickContext<'_>) -> TreeNodeStatus {
        if !self.base.can_execute(ctx.agent) {
            return TreeNodeStatus::CannotExecute;
        }
        let delta = ctx.delta_millis;
        let state = ctx.states.entry(self.base.id());
        let remaining = match state.timer_millis {
            None => self.millis,
            Some(left) => left - delta,
        };
        let status = if remaining > 0 {
            state.timer_millis = Some(remaining);
            TreeNodeStatus::Running
        } else {
            state.timer_millis = None;
            TreeNodeStatus::Finished
        };
        self.base.record(ctx, status)
    }
}

/// Logs its parameters and finishes.
pub struct Print {
    base: NodeBase,
}

impl Print {
    pub fn new(base: NodeBase) -> Self {
        Self { base }
    }
}

impl TreeNode for Print {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn execute(&self, ctx: &mut TickContext<'_>) -> TreeNodeStatus {
        if !self.base.can_execute(ctx.agent) {
            return TreeNodeStatus::CannotExecute;
        }
        info!(agent = %ctx.agent.id(), node = self.base.name(), "{}", self.base.parameters());
        self.base.record(ctx, TreeNodeStatus::Finished)
    }
}

pub type TaskFn = dyn Fn(&mut TickContext<'_>) -> TreeNodeStatus + Send + Sync;

/// Leaf whose body is a closure, for embedders that implement actions natively.
pub struct Task {
    base: NodeBase,
    action: Arc<TaskFn>,
}

impl Task {
    pub fn new<F>(base: NodeBase, action: F) -> Self
    where
        F: Fn(&mut TickContext<'_>) -> TreeNodeStatus + Send + Sync + 'static,
    {
        Self {
            base,
            action: Arc::new(action),
        }
    }

    /// Shares an existing body, e.g. from a factory that creates many nodes.
    pub fn from_shared(base: NodeBase, action: Arc<TaskFn>) -> Self {
        Self { base, action }
    }
}

impl TreeNode for Task {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn execute(&self, ctx: &mut TickContext<'_>) -> TreeNodeStatus {
        if !self.base.can_execute(ctx.agent) {
            return TreeNodeStatus::CannotExecute;
        }
        let status = (self.action)(ctx);
        self.base.record(ctx, status)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("base", &self.base).finish()
    }
}
