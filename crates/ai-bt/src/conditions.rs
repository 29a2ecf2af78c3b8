use core::fmt::Write as _;

use ai_core::{AgentPtr, Condition, ConditionPtr, FactoryError, FilterPtr};

pub struct True;

impl Condition for True {
    fn name(&self) -> &str {
        "True"
    }

    fn evaluate(&self, _agent: &AgentPtr) -> bool {
        true
    }
}

pub struct False;

impl Condition for False {
    fn name(&self) -> &str {
        "False"
    }

    fn evaluate(&self, _agent: &AgentPtr) -> bool {
        false
    }
}

pub struct Not {
    children: Vec<ConditionPtr>,
}

impl Not {
    pub fn new(conditions: Vec<ConditionPtr>) -> Result<Self, FactoryError> {
        if conditions.len() != 1 {
            return Err(FactoryError::Failed(format!(
                "Not takes exactly one condition, got {}",
                conditions.len()
            )));
        }
        Ok(Self {
            children: conditions,
        })
    }
}

impl Condition for Not {
    fn name(&self) -> &str {
        "Not"
    }

    fn children(&self) -> &[ConditionPtr] {
        &self.children
    }

    fn evaluate(&self, agent: &AgentPtr) -> bool {
        !self.children[0].evaluate(agent)
    }
}

/// True when every nested condition is true. Short-circuits.
pub struct And {
    children: Vec<ConditionPtr>,
}

impl And {
    pub fn new(conditions: Vec<ConditionPtr>) -> Result<Self, FactoryError> {
        if conditions.is_empty() {
            return Err(FactoryError::Missing("conditions"));
        }
        Ok(Self {
            children: conditions,
        })
    }
}

impl Condition for And {
    fn name(&self) -> &str {
        "And"
    }

    fn children(&self) -> &[ConditionPtr] {
        &self.children
    }

    fn evaluate(&self, agent: &AgentPtr) -> bool {
        self.children.iter().all(|c| c.evaluate(agent))
    }
}

/// True when any nested condition is true. Short-circuits.
pub struct Or {
    children: Vec<ConditionPtr>,
}

impl Or {
    pub fn new(conditions: Vec<ConditionPtr>) -> Result<Self, FactoryError> {
        if conditions.is_empty() {
            return Err(FactoryError::Missing("conditions"));
        }
        Ok(Self {
            children: conditions,
        })
    }
}

impl Condition for Or {
    fn name(&self) -> &str {
        "Or"
    }

    fn children(&self) -> &[ConditionPtr] {
        &self.children
    }

    fn evaluate(&self, agent: &AgentPtr) -> bool {
        self.children.iter().any(|c| c.evaluate(agent))
    }
}

/// True when the agent has at least `n` filtered entities (default 1).
pub struct HasFilteredEntities {
    parameters: String,
    count: usize,
}

impl HasFilteredEntities {
    pub fn new(parameters: &str) -> Result<Self, FactoryError> {
        let count = if parameters.trim().is_empty() {
            1
        } else {
            parameters
                .trim()
                .parse()
                .map_err(|_| FactoryError::InvalidParameters {
                    parameters: parameters.to_string(),
                    reason: "expected an entity count".to_string(),
                })?
        };
        Ok(Self {
            parameters: parameters.to_string(),
            count,
        })
    }
}

impl Condition for HasFilteredEntities {
    fn name(&self) -> &str {
        "HasFilteredEntities"
    }

    fn parameters(&self) -> &str {
        &self.parameters
    }

    fn evaluate(&self, agent: &AgentPtr) -> bool {
        agent.filtered_entities().len() >= self.count
    }
}

/// `IsAttribute{key,value}` compares a character attribute; `IsAttribute{key}` only checks
/// that it is present.
pub struct IsAttribute {
    parameters: String,
    key: String,
    value: Option<String>,
}

impl IsAttribute {
    pub fn new(parameters: &str) -> Result<Self, FactoryError> {
        let mut parts = parameters.splitn(2, ',').map(str::trim);
        let key = parts.next().unwrap_or_default();
        if key.is_empty() {
            return Err(FactoryError::InvalidParameters {
                parameters: parameters.to_string(),
                reason: "expected an attribute key".to_string(),
            });
        }
        Ok(Self {
            parameters: parameters.to_string(),
            key: key.to_string(),
            value: parts.next().map(str::to_string),
        })
    }
}

impl Condition for IsAttribute {
    fn name(&self) -> &str {
        "IsAttribute"
    }

    fn parameters(&self) -> &str {
        &self.parameters
    }

    fn evaluate(&self, agent: &AgentPtr) -> bool {
        match (agent.character().attribute(&self.key), &self.value) {
            (Some(actual), Some(expected)) => actual == *expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Rebuilds the agent's filtered entities from its filters and is true when any were found.
pub struct FilterCondition {
    filters: Vec<FilterPtr>,
}

impl FilterCondition {
    pub fn new(filters: Vec<FilterPtr>) -> Result<Self, FactoryError> {
        if filters.is_empty() {
            return Err(FactoryError::Missing("filters"));
        }
        Ok(Self { filters })
    }
}

impl Condition for FilterCondition {
    fn name(&self) -> &str {
        "Filter"
    }

    fn evaluate(&self, agent: &AgentPtr) -> bool {
        agent.clear_filtered_entities();
        for filter in &self.filters {
            filter.filter(agent);
        }
        !agent.filtered_entities().is_empty()
    }

    fn name_with_conditions(&self, agent: &AgentPtr) -> String {
        let mut out = String::from("Filter(");
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(filter.name());
            if !filter.parameters().is_empty() {
                let _ = write!(out, "{{{}}}", filter.parameters());
            }
        }
        let _ = write!(out, ")[{}]", u8::from(self.evaluate(agent)));
        out
    }
}
