use ai_core::{FactoryError, NodeBase, TickContext, TreeNode, TreeNodePtr, TreeNodeStatus};
use rand::Rng;

/// Runs children in priority order until one does not fail.
///
/// A child that returns `Running` is memorized and resumed directly on the next tick; every
/// other child has its per-agent state reset.
pub struct PrioritySelector {
    base: NodeBase,
    children: Vec<TreeNodePtr>,
}

impl PrioritySelector {
    pub fn new(base: NodeBase, children: Vec<TreeNodePtr>) -> Self {
        Self { base, children }
    }
}

impl TreeNode for PrioritySelector {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn children(&self) -> &[TreeNodePtr] {
        &self.children
    }

    fn execute(&self, ctx: &mut TickContext<'_>) -> TreeNodeStatus {
        if self.children.is_empty() || !self.base.can_execute(ctx.agent) {
            return TreeNodeStatus::CannotExecute;
        }

        let id = self.base.id();
        let start = ctx.states.selected(id).unwrap_or(0);
        let mut overall = TreeNodeStatus::Failed;
        let mut decided = false;
        for (i, child) in self.children.iter().enumerate() {
            if i < start || decided {
                child.reset_state(ctx.states);
                continue;
            }
            match child.execute(ctx) {
                TreeNodeStatus::Running => {
                    ctx.states.set_selected(id, Some(i));
                    overall = TreeNodeStatus::Running;
                    decided = true;
                }
                TreeNodeStatus::Finished => {
                    overall = TreeNodeStatus::Finished;
                    decided = true;
                }
                TreeNodeStatus::CannotExecute | TreeNodeStatus::Failed => {
                    child.reset_state(ctx.states);
                }
            }
        }

        if !overall.is_running() {
            ctx.states.set_selected(id, None);
        }
        self.base.record(ctx, overall)
    }

    fn running_children(&self, states: &ai_core::NodeStateStore) -> Vec<bool> {
        let selected = states.selected(self.base.id());
        (0..self.children.len()).map(|i| selected == Some(i)).collect()
    }
}

/// Runs children in order; stops at the first child that does not finish.
pub struct Sequence {
    base: NodeBase,
    children: Vec<TreeNodePtr>,
}

impl Sequence {
    pub fn new(base: NodeBase, children: Vec<TreeNodePtr>) -> Self {
        Self { base, children }
    }
}

impl TreeNode for Sequence {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn children(&self) -> &[TreeNodePtr] {
        &self.children
    }

    fn execute(&self, ctx: &mut TickContext<'_>) -> TreeNodeStatus {
        if self.children.is_empty() || !self.base.can_execute(ctx.agent) {
            return TreeNodeStatus::CannotExecute;
        }

        let id = self.base.id();
        let start = ctx.states.selected(id).unwrap_or(0);
        let mut status = TreeNodeStatus::Finished;
        for (i, child) in self.children.iter().enumerate().skip(start) {
            status = child.execute(ctx);
            match status {
                TreeNodeStatus::Running => {
                    ctx.states.set_selected(id, Some(i));
                    return self.base.record(ctx, status);
                }
                TreeNodeStatus::Finished => continue,
                TreeNodeStatus::CannotExecute | TreeNodeStatus::Failed => {
                    for child in &self.children {
                        child.reset_state(ctx.states);
                    }
                    break;
                }
            }
        }

        ctx.states.set_selected(id, None);
        self.base.record(ctx, status)
    }

    fn running_children(&self, states: &ai_core::NodeStateStore) -> Vec<bool> {
        let selected = states.selected(self.base.id());
        (0..self.children.len()).map(|i| selected == Some(i)).collect()
    }
}

/// Executes every child each tick. Running while any child runs.
pub struct Parallel {
    base: NodeBase,
    children: Vec<TreeNodePtr>,
}

impl Parallel {
    pub fn new(base: NodeBase, children: Vec<TreeNodePtr>) -> Self {
        Self { base, children }
    }
}

impl TreeNode for Parallel {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn children(&self) -> &[TreeNodePtr] {
        &self.children
    }

    fn execute(&self, ctx: &mut TickContext<'_>) -> TreeNodeStatus {
        if self.children.is_empty() || !self.base.can_execute(ctx.agent) {
            return TreeNodeStatus::CannotExecute;
        }

        let mut running = false;
        for child in &self.children {
            running |= child.execute(ctx).is_running();
        }
        if running {
            return self.base.record(ctx, TreeNodeStatus::Running);
        }
        for child in &self.children {
            child.reset_state(ctx.states);
        }
        self.base.record(ctx, TreeNodeStatus::Finished)
    }
}

/// Picks one child by weighted random draw and sticks with it while it is running.
pub struct ProbabilitySelector {
    base: NodeBase,
    children: Vec<TreeNodePtr>,
    weights: Vec<f32>,
    weight_sum: f32,
}

impl ProbabilitySelector {
    /// Weights come from the comma separated parameters, one per child. Empty parameters weigh
    /// every child equally.
    pub fn new(base: NodeBase, children: Vec<TreeNodePtr>) -> Result<Self, FactoryError> {
        let weights = parse_weights(base.parameters(), children.len())?;
        let weight_sum = weights.iter().sum();
        Ok(Self {
            base,
            children,
            weights,
            weight_sum,
        })
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn weight_sum(&self) -> f32 {
        self.weight_sum
    }

    fn draw(&self) -> usize {
        if self.weight_sum <= 0.0 {
            return 0;
        }
        let r = rand::thread_rng().gen_range(0.0..self.weight_sum);
        pick(&self.weights, r)
    }
}

impl TreeNode for ProbabilitySelector {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn children(&self) -> &[TreeNodePtr] {
        &self.children
    }

    fn execute(&self, ctx: &mut TickContext<'_>) -> TreeNodeStatus {
        if self.children.is_empty() || !self.base.can_execute(ctx.agent) {
            return TreeNodeStatus::CannotExecute;
        }

        let id = self.base.id();
        let index = match ctx.states.selected(id) {
            Some(index) if index < self.children.len() => index,
            _ => self.draw(),
        };

        let status = self.children[index].execute(ctx);
        ctx.states
            .set_selected(id, status.is_running().then_some(index));
        for (i, child) in self.children.iter().enumerate() {
            if i != index {
                child.reset_state(ctx.states);
            }
        }
        self.base.record(ctx, status)
    }

    fn running_children(&self, states: &ai_core::NodeStateStore) -> Vec<bool> {
        let selected = states.selected(self.base.id());
        (0..self.children.len()).map(|i| selected == Some(i)).collect()
    }
}

/// Index of the first weight the remaining draw `r` falls under.
///
/// `r` is reduced by each weight it passes. Draws past the end land on the last index.
pub fn pick(weights: &[f32], mut r: f32) -> usize {
    for (i, weight) in weights.iter().enumerate() {
        if r < *weight {
            return i;
        }
        r -= weight;
    }
    weights.len().saturating_sub(1)
}

fn parse_weights(parameters: &str, children: usize) -> Result<Vec<f32>, FactoryError> {
    let invalid = |reason: &str| FactoryError::InvalidParameters {
        parameters: parameters.to_string(),
        reason: reason.to_string(),
    };

    if parameters.trim().is_empty() {
        return Ok(vec![1.0; children]);
    }
    let weights = parameters
        .split(',')
        .map(|w| w.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid("weights must be numbers"))?;
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(invalid("weights must be finite and not negative"));
    }
    if weights.len() != children {
        return Err(invalid("expected one weight per child"));
    }
    Ok(weights)
}
