//! Lua 5.4 scripting for the behaviour tree engine.
//!
//! [`LuaAiRegistry`] lets scripts declare node, condition, filter and steering types that
//! plug into an [`ai_bt::AiRegistry`]; [`LuaTreeLoader`] builds whole trees from scripts.
//!
//! Script-created instances are native wrappers holding a registry key into the Lua state.
//! The Lua side only ever sees agents through short-lived userdata, so after a collection
//! pass no reference to an agent or a wrapper survives inside the state.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

mod error;
mod loader;
mod registry;
mod runtime;
mod script;
mod userdata;

pub use error::LuaError;
pub use loader::LuaTreeLoader;
pub use registry::LuaAiRegistry;
pub use runtime::ScriptRuntime;
pub use script::{LuaCondition, LuaFilter, LuaSteering, LuaTreeNode, ScriptKind, ScriptType};
pub use userdata::{LuaAgent, LuaAggroMgr, LuaCharacter, LuaGroupMgr, LuaVec, LuaZone};
