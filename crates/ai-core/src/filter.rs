use std::sync::Arc;

use crate::AgentPtr;

pub type FilterPtr = Arc<dyn Filter>;

/// Selects entities into the agent's filtered list.
pub trait Filter: Send + Sync {
    fn name(&self) -> &str;

    fn parameters(&self) -> &str {
        ""
    }

    fn filter(&self, agent: &AgentPtr);
}
