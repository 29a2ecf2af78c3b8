//! Entity filters. Each one edits the agent's filtered entity list in place.

use ai_core::{AgentId, AgentPtr, FactoryError, Filter, FilterPtr};

/// Clears the list.
pub struct SelectEmpty;

impl Filter for SelectEmpty {
    fn name(&self) -> &str {
        "SelectEmpty"
    }

    fn filter(&self, agent: &AgentPtr) {
        agent.clear_filtered_entities();
    }
}

/// Keeps the list as is.
pub struct SelectAll;

impl Filter for SelectAll {
    fn name(&self) -> &str {
        "SelectAll"
    }

    fn filter(&self, _agent: &AgentPtr) {}
}

/// Appends every entity the character can see.
pub struct SelectVisible;

impl Filter for SelectVisible {
    fn name(&self) -> &str {
        "SelectVisible"
    }

    fn filter(&self, agent: &AgentPtr) {
        let mut visible = Vec::new();
        agent.character().visit_visible(&mut |id| visible.push(id));
        for id in visible {
            agent.add_filtered_entity(id);
        }
    }
}

fn run_all(filters: &[FilterPtr], agent: &AgentPtr) {
    for filter in filters {
        filter.filter(agent);
    }
}

/// Runs each filter on an empty list and returns what every one of them selected.
fn collect_each(filters: &[FilterPtr], agent: &AgentPtr) -> Vec<Vec<AgentId>> {
    filters
        .iter()
        .map(|filter| {
            agent.clear_filtered_entities();
            filter.filter(agent);
            agent.filtered_entities()
        })
        .collect()
}

/// Runs its filters, then keeps only the first entity.
pub struct First {
    filters: Vec<FilterPtr>,
}

impl First {
    pub fn new(filters: Vec<FilterPtr>) -> Self {
        Self { filters }
    }
}

impl Filter for First {
    fn name(&self) -> &str {
        "First"
    }

    fn filter(&self, agent: &AgentPtr) {
        run_all(&self.filters, agent);
        let first = agent.filtered_entities().into_iter().next();
        agent.set_filtered_entities(first.into_iter().collect());
    }
}

/// Runs its filters, then keeps only the last entity.
pub struct Last {
    filters: Vec<FilterPtr>,
}

impl Last {
    pub fn new(filters: Vec<FilterPtr>) -> Self {
        Self { filters }
    }
}

impl Filter for Last {
    fn name(&self) -> &str {
        "Last"
    }

    fn filter(&self, agent: &AgentPtr) {
        run_all(&self.filters, agent);
        let last = agent.filtered_entities().pop();
        agent.set_filtered_entities(last.into_iter().collect());
    }
}

/// Entities selected by any of its filters, in first-seen order.
pub struct Union {
    filters: Vec<FilterPtr>,
}

impl Union {
    pub fn new(filters: Vec<FilterPtr>) -> Result<Self, FactoryError> {
        if filters.is_empty() {
            return Err(FactoryError::Missing("filters"));
        }
        Ok(Self { filters })
    }
}

impl Filter for Union {
    fn name(&self) -> &str {
        "Union"
    }

    fn filter(&self, agent: &AgentPtr) {
        let mut result: Vec<AgentId> = Vec::new();
        for selected in collect_each(&self.filters, agent) {
            for id in selected {
                if !result.contains(&id) {
                    result.push(id);
                }
            }
        }
        agent.set_filtered_entities(result);
    }
}

/// Entities selected by all of its filters, in the order of the first filter.
pub struct Intersection {
    filters: Vec<FilterPtr>,
}

impl Intersection {
    pub fn new(filters: Vec<FilterPtr>) -> Result<Self, FactoryError> {
        if filters.is_empty() {
            return Err(FactoryError::Missing("filters"));
        }
        Ok(Self { filters })
    }
}

impl Filter for Intersection {
    fn name(&self) -> &str {
        "Intersection"
    }

    fn filter(&self, agent: &AgentPtr) {
        let mut sets = collect_each(&self.filters, agent).into_iter();
        let mut result = sets.next().unwrap_or_default();
        for other in sets {
            result.retain(|id| other.contains(id));
        }
        let mut seen = Vec::with_capacity(result.len());
        result.retain(|id| {
            let fresh = !seen.contains(id);
            seen.push(*id);
            fresh
        });
        agent.set_filtered_entities(result);
    }
}
