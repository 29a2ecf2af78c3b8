//! Behaviour tree node library built on `ai-core`.
//!
//! Trees are assembled from type names through an [`AiRegistry`], either directly or from a
//! [`TreeSpec`] arena, and are then shared read-only by every agent that runs them.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod conditions;
pub mod decorators;
pub mod filters;
pub mod loader;
pub mod nodes;
pub mod parser;
pub mod registry;
pub mod steerings;
pub mod tasks;

pub use conditions::{
    And, False, FilterCondition, HasFilteredEntities, IsAttribute, Not, Or, True,
};
pub use decorators::{Fail, Invert, Limit, Succeed};
pub use filters::{First, Intersection, Last, SelectAll, SelectEmpty, SelectVisible, Union};
pub use loader::{LoadError, NodeSpec, TreeLoader, TreeSpec};
pub use nodes::{Parallel, PrioritySelector, ProbabilitySelector, Sequence};
pub use parser::{
    parse, parse_condition, parse_filter, parse_node, parse_steering, Expr, ParseError,
};
pub use registry::{
    AiRegistry, ConditionFactoryContext, FilterFactoryContext, SteeringFactoryContext,
    TreeNodeFactoryContext,
};
pub use steerings::{FixedSteering, Stop};
pub use tasks::{Idle, Print, Task};

/// The default selector.
pub type Selector = PrioritySelector;
