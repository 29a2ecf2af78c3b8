use core::fmt;
use std::sync::{Mutex, PoisonError};

use mlua::Lua;
use tracing::debug;

use crate::LuaError;

/// One Lua state behind a lock.
///
/// Calls into the state are serialized, so script-backed nodes may run on zone workers.
/// Everything stored inside the state refers back to native objects weakly; the only strong
/// references cross the other way (registry keys held by wrappers).
#[derive(Default)]
pub struct ScriptRuntime {
    lua: Mutex<Option<Lua>>,
}

impl ScriptRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.lua
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Creates the state and runs `setup` on it. Does nothing if already running.
    pub fn start(&self, setup: impl FnOnce(&Lua) -> mlua::Result<()>) -> Result<(), LuaError> {
        let mut guard = self.lua.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return Ok(());
        }
        let lua = Lua::new();
        setup(&lua)?;
        *guard = Some(lua);
        debug!("script runtime started");
        Ok(())
    }

    /// Runs `f` against the live state.
    pub fn with<R>(&self, f: impl FnOnce(&Lua) -> mlua::Result<R>) -> Result<R, LuaError> {
        let guard = self.lua.lock().unwrap_or_else(PoisonError::into_inner);
        let lua = guard.as_ref().ok_or(LuaError::Shutdown)?;
        Ok(f(lua)?)
    }

    /// Full garbage collection pass, then releases registry slots of dropped keys.
    pub fn gc_collect(&self) -> Result<(), LuaError> {
        self.with(|lua| {
            lua.gc_collect()?;
            lua.expire_registry_values();
            Ok(())
        })
    }

    /// Closes the state. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let lua = self
            .lua
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        // Closing finalizes userdata, which may drop agents; do it without holding the lock.
        let stopped = lua.is_some();
        drop(lua);
        if stopped {
            debug!("script runtime stopped");
        }
        stopped
    }
}

impl fmt::Debug for ScriptRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRuntime")
            .field("running", &self.is_running())
            .finish()
    }
}
