use core::fmt::Write as _;
use std::sync::Arc;

use crate::AgentPtr;

pub type ConditionPtr = Arc<dyn Condition>;

/// Boolean gate consulted before a node executes.
pub trait Condition: Send + Sync {
    fn name(&self) -> &str;

    fn parameters(&self) -> &str {
        ""
    }

    fn evaluate(&self, agent: &AgentPtr) -> bool;

    /// Nested conditions, for composites like `And` or `Not`.
    fn children(&self) -> &[ConditionPtr] {
        &[]
    }

    /// Debug rendering including the current result, e.g. `And(True[1],False[0])[0]`.
    fn name_with_conditions(&self, agent: &AgentPtr) -> String {
        let mut out = String::from(self.name());
        if !self.parameters().is_empty() {
            let _ = write!(out, "{{{}}}", self.parameters());
        }
        let children = self.children();
        if !children.is_empty() {
            out.push('(');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&child.name_with_conditions(agent));
            }
            out.push(')');
        }
        let _ = write!(out, "[{}]", u8::from(self.evaluate(agent)));
        out
    }
}
