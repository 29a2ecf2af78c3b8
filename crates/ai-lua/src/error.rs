//! Error types for the scripting bridge.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LuaError {
    /// Lua runtime error, including syntax errors and errors raised by scripts.
    #[error("lua error: {0}")]
    Runtime(#[from] mlua::Error),

    /// The runtime was never started or has been shut down.
    #[error("script runtime is shut down")]
    Shutdown,
}
