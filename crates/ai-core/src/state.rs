use std::collections::HashMap;

use crate::{NodeId, TreeNodeStatus};

/// Transient execution state of one node for one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeState {
    /// Child index a composite resumes on its next visit.
    pub selected: Option<usize>,
    pub last_status: Option<TreeNodeStatus>,
    pub last_exec_millis: Option<i64>,
    /// Remaining time of a timed node.
    pub timer_millis: Option<i64>,
    /// Execution count of a `Limit` decorator. `Limit` keeps it across resets.
    pub counter: u32,
}

/// Side table of [`NodeState`] for a single agent.
///
/// Entries are created lazily on first write and removed again when a node is reset, so an
/// agent that has never visited a branch carries no state for it. A `Limit` that already ran
/// keeps an entry holding only its count.
#[derive(Debug, Default)]
pub struct NodeStateStore {
    states: HashMap<NodeId, NodeState>,
}

impl NodeStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId) -> Option<&NodeState> {
        self.states.get(&node)
    }

    pub fn entry(&mut self, node: NodeId) -> &mut NodeState {
        self.states.entry(node).or_default()
    }

    pub fn selected(&self, node: NodeId) -> Option<usize> {
        self.get(node).and_then(|s| s.selected)
    }

    pub fn set_selected(&mut self, node: NodeId, selected: Option<usize>) {
        match selected {
            Some(index) => self.entry(node).selected = Some(index),
            None => {
                if let Some(state) = self.states.get_mut(&node) {
                    state.selected = None;
                }
            }
        }
    }

    pub fn last_status(&self, node: NodeId) -> Option<TreeNodeStatus> {
        self.get(node).and_then(|s| s.last_status)
    }

    pub fn last_exec_millis(&self, node: NodeId) -> Option<i64> {
        self.get(node).and_then(|s| s.last_exec_millis)
    }

    /// Records the outcome of an execution at agent time `now`.
    pub fn record(&mut self, node: NodeId, status: TreeNodeStatus, now: i64) {
        let state = self.entry(node);
        state.last_status = Some(status);
        state.last_exec_millis = Some(now);
    }

    pub fn remove(&mut self, node: NodeId) -> Option<NodeState> {
        self.states.remove(&node)
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
