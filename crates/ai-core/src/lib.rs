//! Behaviour tree kernel primitives shared by every other `ai-*` crate.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod aggro;
pub mod character;
pub mod condition;
pub mod filter;
pub mod registry;
pub mod state;
pub mod status;
pub mod steering;
pub mod tick;
pub mod tree;

pub use agent::{Agent, AgentId, AgentPtr, ZoneHandle};
pub use aggro::{AggroEntry, AggroMgr, AggroReduction};
pub use character::{BasicCharacter, Character, CharacterPtr, Vec3};
pub use condition::{Condition, ConditionPtr};
pub use filter::{Filter, FilterPtr};
pub use registry::{Factory, FactoryError, FactoryRegistry};
pub use state::{NodeState, NodeStateStore};
pub use status::TreeNodeStatus;
pub use steering::{MoveVector, Steering, SteeringPtr};
pub use tick::TickContext;
pub use tree::{find_node, NodeBase, NodeId, TreeNode, TreeNodePtr};
