//! Single-child nodes that rewrite their child's status.

use ai_core::{
    FactoryError, NodeBase, NodeStateStore, TickContext, TreeNode, TreeNodePtr, TreeNodeStatus,
};

fn single_child(children: Vec<TreeNodePtr>) -> Result<Vec<TreeNodePtr>, FactoryError> {
    match children.len() {
        1 => Ok(children),
        0 => Err(FactoryError::Missing("child node")),
        n => Err(FactoryError::Failed(format!(
            "decorators take exactly one child, got {n}"
        ))),
    }
}

macro_rules! decorator {
    ($(#[$meta:meta])* $name:ident, |$status:ident| $map:expr) => {
        $(#[$meta])*
        pub struct $name {
            base: NodeBase,
            children: Vec<TreeNodePtr>,
        }

        impl $name {
            pub fn new(base: NodeBase, children: Vec<TreeNodePtr>) -> Result<Self, FactoryError> {
                Ok(Self {
                    base,
                    children: single_child(children)?,
                })
            }
        }

        impl TreeNode for $name {
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
                let $status = self.children[0].execute(ctx);
                self.base.record(ctx, $map)
            }
        }
    };
}

decorator!(
    /// Swaps `Finished` and `Failed`.
    Invert,
    |status| match status {
        TreeNodeStatus::Finished => TreeNodeStatus::Failed,
        TreeNodeStatus::Failed => TreeNodeStatus::Finished,
        other => other,
    }
);

decorator!(
    /// `Finished` unless the child is still running.
    Succeed,
    |status| if status.is_running() {
        TreeNodeStatus::Running
    } else {
        TreeNodeStatus::Finished
    }
);

decorator!(
    /// `Failed` unless the child is still running.
    Fail,
    |status| if status.is_running() {
        TreeNodeStatus::Running
    } else {
        TreeNodeStatus::Failed
    }
);

/// Lets its child execute at most `amount` times per agent, then reports `Finished`.
///
/// The count survives [`TreeNode::reset_state`], so composites that reset finished or failed
/// branches do not hand out fresh executions.
pub struct Limit {
    base: NodeBase,
    children: Vec<TreeNodePtr>,
    amount: u32,
}

impl Limit {
    pub fn new(base: NodeBase, children: Vec<TreeNodePtr>) -> Result<Self, FactoryError> {
        let amount = base
            .parameters()
            .trim()
            .parse::<u32>()
            .map_err(|_| FactoryError::InvalidParameters {
                parameters: base.parameters().to_string(),
                reason: "expected the execution limit".to_string(),
            })?;
        Ok(Self {
            base,
            children: single_child(children)?,
            amount,
        })
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }
}

impl TreeNode for Limit {
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
        let executed = ctx.states.get(self.base.id()).map_or(0, |s| s.counter);
        if executed >= self.amount {
            return self.base.record(ctx, TreeNodeStatus::Finished);
        }
        let status = self.children[0].execute(ctx);
        ctx.states.entry(self.base.id()).counter = executed + 1;
        self.base.record(ctx, status)
    }

    fn reset_state(&self, states: &mut NodeStateStore) {
        let executed = states.remove(self.base.id()).map_or(0, |s| s.counter);
        if executed > 0 {
            states.entry(self.base.id()).counter = executed;
        }
        self.children[0].reset_state(states);
    }
}
