//! Headless runner for behaviour tree zones.
//!
//! A [`RunConfig`] names the Lua scripts to evaluate, the tree scripts to build and the zones
//! to populate; [`World`] assembles them and the `ai-run` binary ticks the result while
//! serving the remote debugger.

#![forbid(unsafe_code)]

pub mod config;
pub mod world;

pub use config::{RunConfig, ZoneSpec};
pub use world::World;
