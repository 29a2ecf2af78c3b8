use std::sync::Arc;

use ai_core::{
    ConditionPtr, Factory, FactoryRegistry, FilterPtr, NodeBase, SteeringPtr, TreeNodePtr,
};

use crate::conditions::{
    And, False, FilterCondition, HasFilteredEntities, IsAttribute, Not, Or, True,
};
use crate::decorators::{Fail, Invert, Limit, Succeed};
use crate::filters::{First, Intersection, Last, SelectAll, SelectEmpty, SelectVisible, Union};
use crate::nodes::{Parallel, PrioritySelector, ProbabilitySelector, Sequence};
use crate::steerings::{FixedSteering, Stop};
use crate::tasks::{Idle, Print};

/// Everything a tree node factory gets to build one node.
///
/// Children are passed in up front: nodes are immutable once created.
#[derive(Default, Clone)]
pub struct TreeNodeFactoryContext {
    pub type_name: String,
    pub name: String,
    pub parameters: String,
    pub condition: Option<ConditionPtr>,
    pub children: Vec<TreeNodePtr>,
}

impl TreeNodeFactoryContext {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = parameters.into();
        self
    }

    pub fn with_condition(mut self, condition: ConditionPtr) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_children(mut self, children: Vec<TreeNodePtr>) -> Self {
        self.children = children;
        self
    }

    /// Node base for a node created from this context.
    pub fn base(&self) -> NodeBase {
        NodeBase::new(
            self.type_name.clone(),
            self.name.clone(),
            self.parameters.clone(),
            self.condition.clone(),
        )
    }
}

#[derive(Default, Clone)]
pub struct ConditionFactoryContext {
    pub parameters: String,
    pub conditions: Vec<ConditionPtr>,
    /// Only used by the `Filter` condition.
    pub filters: Vec<FilterPtr>,
}

impl ConditionFactoryContext {
    pub fn new(parameters: impl Into<String>) -> Self {
        Self {
            parameters: parameters.into(),
            ..Self::default()
        }
    }
}

#[derive(Default, Clone)]
pub struct FilterFactoryContext {
    pub parameters: String,
    pub filters: Vec<FilterPtr>,
}

impl FilterFactoryContext {
    pub fn new(parameters: impl Into<String>) -> Self {
        Self {
            parameters: parameters.into(),
            ..Self::default()
        }
    }
}

#[derive(Default, Clone)]
pub struct SteeringFactoryContext {
    pub parameters: String,
}

impl SteeringFactoryContext {
    pub fn new(parameters: impl Into<String>) -> Self {
        Self {
            parameters: parameters.into(),
        }
    }
}

pub type NodeRegistry = FactoryRegistry<TreeNodePtr, TreeNodeFactoryContext>;
pub type ConditionRegistry = FactoryRegistry<ConditionPtr, ConditionFactoryContext>;
pub type FilterRegistry = FactoryRegistry<FilterPtr, FilterFactoryContext>;
pub type SteeringRegistry = FactoryRegistry<SteeringPtr, SteeringFactoryContext>;

/// The four factory registries an engine needs, owned in one place and passed around by
/// reference instead of living in globals.
#[derive(Debug)]
pub struct AiRegistry {
    nodes: NodeRegistry,
    conditions: ConditionRegistry,
    filters: FilterRegistry,
    steerings: SteeringRegistry,
}

impl Default for AiRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AiRegistry {
    /// A registry with all built-in types.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register_builtin_nodes();
        registry.register_builtin_conditions();
        registry.register_builtin_filters();
        registry.register_builtin_steerings();
        registry
    }

    pub fn empty() -> Self {
        Self {
            nodes: FactoryRegistry::new("node"),
            conditions: FactoryRegistry::new("condition"),
            filters: FactoryRegistry::new("filter"),
            steerings: FactoryRegistry::new("steering"),
        }
    }

    pub fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    pub fn conditions(&self) -> &ConditionRegistry {
        &self.conditions
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn steerings(&self) -> &SteeringRegistry {
        &self.steerings
    }

    pub fn register_node_factory(
        &self,
        type_name: impl Into<String>,
        factory: Arc<dyn Factory<TreeNodePtr, TreeNodeFactoryContext>>,
    ) -> bool {
        self.nodes.register(type_name, factory)
    }

    pub fn unregister_node_factory(&self, type_name: &str) -> bool {
        self.nodes.unregister(type_name)
    }

    pub fn register_condition_factory(
        &self,
        type_name: impl Into<String>,
        factory: Arc<dyn Factory<ConditionPtr, ConditionFactoryContext>>,
    ) -> bool {
        self.conditions.register(type_name, factory)
    }

    pub fn unregister_condition_factory(&self, type_name: &str) -> bool {
        self.conditions.unregister(type_name)
    }

    pub fn register_filter_factory(
        &self,
        type_name: impl Into<String>,
        factory: Arc<dyn Factory<FilterPtr, FilterFactoryContext>>,
    ) -> bool {
        self.filters.register(type_name, factory)
    }

    pub fn unregister_filter_factory(&self, type_name: &str) -> bool {
        self.filters.unregister(type_name)
    }

    pub fn register_steering_factory(
        &self,
        type_name: impl Into<String>,
        factory: Arc<dyn Factory<SteeringPtr, SteeringFactoryContext>>,
    ) -> bool {
        self.steerings.register(type_name, factory)
    }

    pub fn unregister_steering_factory(&self, type_name: &str) -> bool {
        self.steerings.unregister(type_name)
    }

    /// Creates a node of `ctx.type_name`.
    pub fn create_node(&self, ctx: &TreeNodeFactoryContext) -> Option<TreeNodePtr> {
        self.nodes.create(&ctx.type_name, ctx)
    }

    pub fn create_condition(
        &self,
        type_name: &str,
        ctx: &ConditionFactoryContext,
    ) -> Option<ConditionPtr> {
        self.conditions.create(type_name, ctx)
    }

    pub fn create_filter(&self, type_name: &str, ctx: &FilterFactoryContext) -> Option<FilterPtr> {
        self.filters.create(type_name, ctx)
    }

    pub fn create_steering(
        &self,
        type_name: &str,
        ctx: &SteeringFactoryContext,
    ) -> Option<SteeringPtr> {
        self.steerings.create(type_name, ctx)
    }

    fn register_builtin_nodes(&self) {
        let nodes = &self.nodes;
        nodes.register_fn("PrioritySelector", |ctx: &TreeNodeFactoryContext| {
            Ok(Arc::new(PrioritySelector::new(ctx.base(), ctx.children.clone())) as TreeNodePtr)
        });
        nodes.register_fn("Selector", |ctx: &TreeNodeFactoryContext| {
            Ok(Arc::new(PrioritySelector::new(ctx.base(), ctx.children.clone())) as TreeNodePtr)
        });
        nodes.register_fn("Sequence", |ctx: &TreeNodeFactoryContext| {
            Ok(Arc::new(Sequence::new(ctx.base(), ctx.children.clone())) as TreeNodePtr)
        });
        nodes.register_fn("Parallel", |ctx: &TreeNodeFactoryContext| {
            Ok(Arc::new(Parallel::new(ctx.base(), ctx.children.clone())) as TreeNodePtr)
        });
        nodes.register_fn("ProbabilitySelector", |ctx: &TreeNodeFactoryContext| {
            Ok(Arc::new(ProbabilitySelector::new(ctx.base(), ctx.children.clone())?) as TreeNodePtr)
        });
        nodes.register_fn("Invert", |ctx: &TreeNodeFactoryContext| {
            Ok(Arc::new(Invert::new(ctx.base(), ctx.children.clone())?) as TreeNodePtr)
        });
        nodes.register_fn("Succeed", |ctx: &TreeNodeFactoryContext| {
            Ok(Arc::new(Succeed::new(ctx.base(), ctx.children.clone())?) as TreeNodePtr)
        });
        nodes.register_fn("Fail", |ctx: &TreeNodeFactoryContext| {
            Ok(Arc::new(Fail::new(ctx.base(), ctx.children.clone())?) as TreeNodePtr)
        });
        nodes.register_fn("Limit", |ctx: &TreeNodeFactoryContext| {
            Ok(Arc::new(Limit::new(ctx.base(), ctx.children.clone())?) as TreeNodePtr)
        });
        nodes.register_fn("Idle", |ctx: &TreeNodeFactoryContext| {
            Ok(Arc::new(Idle::new(ctx.base())?) as TreeNodePtr)
        });
        nodes.register_fn("Print", |ctx: &TreeNodeFactoryContext| {
            Ok(Arc::new(Print::new(ctx.base())) as TreeNodePtr)
        });
    }

    fn register_builtin_conditions(&self) {
        let conditions = &self.conditions;
        conditions.register_fn("True", |_ctx: &ConditionFactoryContext| {
            Ok(Arc::new(True) as ConditionPtr)
        });
        conditions.register_fn("False", |_ctx: &ConditionFactoryContext| {
            Ok(Arc::new(False) as ConditionPtr)
        });
        conditions.register_fn("Not", |ctx: &ConditionFactoryContext| {
            Ok(Arc::new(Not::new(ctx.conditions.clone())?) as ConditionPtr)
        });
        conditions.register_fn("And", |ctx: &ConditionFactoryContext| {
            Ok(Arc::new(And::new(ctx.conditions.clone())?) as ConditionPtr)
        });
        conditions.register_fn("Or", |ctx: &ConditionFactoryContext| {
            Ok(Arc::new(Or::new(ctx.conditions.clone())?) as ConditionPtr)
        });
        conditions.register_fn("HasFilteredEntities", |ctx: &ConditionFactoryContext| {
            Ok(Arc::new(HasFilteredEntities::new(&ctx.parameters)?) as ConditionPtr)
        });
        conditions.register_fn("IsAttribute", |ctx: &ConditionFactoryContext| {
            Ok(Arc::new(IsAttribute::new(&ctx.parameters)?) as ConditionPtr)
        });
        conditions.register_fn("Filter", |ctx: &ConditionFactoryContext| {
            Ok(Arc::new(FilterCondition::new(ctx.filters.clone())?) as ConditionPtr)
        });
    }

    fn register_builtin_filters(&self) {
        let filters = &self.filters;
        filters.register_fn("SelectEmpty", |_ctx: &FilterFactoryContext| {
            Ok(Arc::new(SelectEmpty) as FilterPtr)
        });
        filters.register_fn("SelectAll", |_ctx: &FilterFactoryContext| {
            Ok(Arc::new(SelectAll) as FilterPtr)
        });
        filters.register_fn("SelectVisible", |_ctx: &FilterFactoryContext| {
            Ok(Arc::new(SelectVisible) as FilterPtr)
        });
        filters.register_fn("First", |ctx: &FilterFactoryContext| {
            Ok(Arc::new(First::new(ctx.filters.clone())) as FilterPtr)
        });
        filters.register_fn("Last", |ctx: &FilterFactoryContext| {
            Ok(Arc::new(Last::new(ctx.filters.clone())) as FilterPtr)
        });
        filters.register_fn("Union", |ctx: &FilterFactoryContext| {
            Ok(Arc::new(Union::new(ctx.filters.clone())?) as FilterPtr)
        });
        filters.register_fn("Intersection", |ctx: &FilterFactoryContext| {
            Ok(Arc::new(Intersection::new(ctx.filters.clone())?) as FilterPtr)
        });
    }

    fn register_builtin_steerings(&self) {
        let steerings = &self.steerings;
        steerings.register_fn("Stop", |_ctx: &SteeringFactoryContext| {
            Ok(Arc::new(Stop) as SteeringPtr)
        });
        steerings.register_fn("Fixed", |ctx: &SteeringFactoryContext| {
            Ok(Arc::new(FixedSteering::new(&ctx.parameters)?) as SteeringPtr)
        });
    }
}
