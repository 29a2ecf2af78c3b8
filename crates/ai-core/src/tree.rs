use core::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{AgentPtr, ConditionPtr, NodeStateStore, TickContext, TreeNodeStatus};

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique identity of a tree node, used as the key for per-agent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type TreeNodePtr = Arc<dyn TreeNode>;

/// Data every node carries: identity, names, raw parameters and the optional guard.
#[derive(Clone)]
pub struct NodeBase {
    id: NodeId,
    name: String,
    type_name: String,
    parameters: String,
    condition: Option<ConditionPtr>,
}

impl NodeBase {
    pub fn new(
        type_name: impl Into<String>,
        name: impl Into<String>,
        parameters: impl Into<String>,
        condition: Option<ConditionPtr>,
    ) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            type_name: type_name.into(),
            parameters: parameters.into(),
            condition,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn parameters(&self) -> &str {
        &self.parameters
    }

    pub fn condition(&self) -> Option<&ConditionPtr> {
        self.condition.as_ref()
    }

    /// Evaluates the guard. A node without a guard may always execute.
    pub fn can_execute(&self, agent: &AgentPtr) -> bool {
        self.condition.as_ref().map_or(true, |c| c.evaluate(agent))
    }

    /// Stores `status` as this node's last result and returns it.
    pub fn record(&self, ctx: &mut TickContext<'_>, status: TreeNodeStatus) -> TreeNodeStatus {
        let now = ctx.now();
        ctx.states.record(self.id, status, now);
        status
    }
}

impl fmt::Debug for NodeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeBase")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("parameters", &self.parameters)
            .field("condition", &self.condition.as_ref().map(|c| c.name().to_owned()))
            .finish()
    }
}

/// A behaviour tree node.
///
/// Nodes are immutable once built and are shared between every agent running the same tree,
/// so all mutable execution state goes through [`TickContext::states`].
///
/// Implementations check their guard first: when [`NodeBase::can_execute`] denies, `execute`
/// returns [`TreeNodeStatus::CannotExecute`] without writing any state.
pub trait TreeNode: Send + Sync {
    fn base(&self) -> &NodeBase;

    fn execute(&self, ctx: &mut TickContext<'_>) -> TreeNodeStatus;

    fn children(&self) -> &[TreeNodePtr] {
        &[]
    }

    fn id(&self) -> NodeId {
        self.base().id()
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    fn type_name(&self) -> &str {
        self.base().type_name()
    }

    fn parameters(&self) -> &str {
        self.base().parameters()
    }

    fn condition(&self) -> Option<&ConditionPtr> {
        self.base().condition()
    }

    /// Drops the agent's state for this node and its whole subtree.
    fn reset_state(&self, states: &mut NodeStateStore) {
        states.remove(self.id());
        for child in self.children() {
            child.reset_state(states);
        }
    }

    /// One flag per child, `true` when that child is running for the agent.
    fn running_children(&self, states: &NodeStateStore) -> Vec<bool> {
        self.children()
            .iter()
            .map(|child| states.last_status(child.id()) == Some(TreeNodeStatus::Running))
            .collect()
    }
}

/// Depth-first lookup of `id` in the tree rooted at `root`.
pub fn find_node(root: &TreeNodePtr, id: NodeId) -> Option<TreeNodePtr> {
    if root.id() == id {
        return Some(Arc::clone(root));
    }
    root.children().iter().find_map(|child| find_node(child, id))
}

impl fmt::Debug for dyn TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("id", &self.id())
            .field("type", &self.type_name())
            .field("name", &self.name())
            .field("children", &self.children().len())
            .finish()
    }
}
