use crate::{AgentPtr, NodeStateStore};

/// Everything a node needs while executing for one agent.
pub struct TickContext<'a> {
    pub agent: &'a AgentPtr,
    pub states: &'a mut NodeStateStore,
    pub delta_millis: i64,
}

impl<'a> TickContext<'a> {
    pub fn new(agent: &'a AgentPtr, states: &'a mut NodeStateStore, delta_millis: i64) -> Self {
        Self {
            agent,
            states,
            delta_millis,
        }
    }

    /// Agent clock in milliseconds.
    pub fn now(&self) -> i64 {
        self.agent.time()
    }
}
