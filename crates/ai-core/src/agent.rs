use core::any::Any;
use core::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{AggroMgr, CharacterPtr, TreeNodePtr};

/// Stable identifier of a controlled entity.
///
/// The id is owned by the world the agent lives in; the AI core only references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct AgentId(pub i64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AgentId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

pub type AgentPtr = Arc<Agent>;

/// Weak link from an agent to the zone it lives in. The zone type is opaque here; the zone
/// crate downcasts it back.
pub type ZoneHandle = Weak<dyn Any + Send + Sync>;

/// An agent wraps the character capability, the behaviour tree root and a little bit of
/// bookkeeping: pause flag, accumulated time, filtered entities and the aggro list.
///
/// Per-node execution state is *not* stored here. It lives in a [`crate::NodeStateStore`]
/// owned by whoever drives the agent (usually a zone), so the tree never points back at
/// the agent and dropping the last `AgentPtr` reclaims everything.
pub struct Agent {
    id: AgentId,
    character: CharacterPtr,
    behaviour: RwLock<Option<TreeNodePtr>>,
    paused: AtomicBool,
    time_millis: AtomicI64,
    filtered: Mutex<Vec<AgentId>>,
    aggro: Mutex<AggroMgr>,
    zone: RwLock<Option<ZoneHandle>>,
}

impl Agent {
    pub fn new(character: CharacterPtr) -> Self {
        Self {
            id: character.id(),
            character,
            behaviour: RwLock::new(None),
            paused: AtomicBool::new(false),
            time_millis: AtomicI64::new(0),
            filtered: Mutex::new(Vec::new()),
            aggro: Mutex::new(AggroMgr::new()),
            zone: RwLock::new(None),
        }
    }

    pub fn with_behaviour(self, root: TreeNodePtr) -> Self {
        self.set_behaviour(Some(root));
        self
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn character(&self) -> &CharacterPtr {
        &self.character
    }

    pub fn behaviour(&self) -> Option<TreeNodePtr> {
        self.behaviour
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the tree root. Returns the previous one.
    pub fn set_behaviour(&self, root: Option<TreeNodePtr>) -> Option<TreeNodePtr> {
        let mut guard = self
            .behaviour
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, root)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn set_pause(&self, pause: bool) {
        self.paused.store(pause, Ordering::Release);
    }

    /// Milliseconds accumulated through [`Agent::update`].
    pub fn time(&self) -> i64 {
        self.time_millis.load(Ordering::Acquire)
    }

    /// Advances the agent clock, decays aggro and lets the character update itself.
    pub fn update(&self, delta_millis: i64, debugging: bool) {
        self.time_millis.fetch_add(delta_millis, Ordering::AcqRel);
        self.aggro_mgr().update(delta_millis);
        self.character.update(delta_millis, debugging);
    }

    pub fn aggro_mgr(&self) -> MutexGuard<'_, AggroMgr> {
        self.aggro.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The zone the agent is in, if that zone is still alive.
    pub fn zone(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.zone
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    pub fn has_zone(&self) -> bool {
        self.zone().is_some()
    }

    /// Called by zones on insertion and removal.
    pub fn set_zone(&self, zone: Option<ZoneHandle>) {
        *self.zone.write().unwrap_or_else(PoisonError::into_inner) = zone;
    }

    pub fn filtered_entities(&self) -> Vec<AgentId> {
        self.filtered().clone()
    }

    pub fn set_filtered_entities(&self, entities: Vec<AgentId>) {
        *self.filtered() = entities;
    }

    pub fn add_filtered_entity(&self, id: AgentId) {
        self.filtered().push(id);
    }

    pub fn clear_filtered_entities(&self) {
        self.filtered().clear();
    }

    fn filtered(&self) -> MutexGuard<'_, Vec<AgentId>> {
        self.filtered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("paused", &self.is_paused())
            .field("time_millis", &self.time())
            .field("has_behaviour", &self.behaviour().is_some())
            .finish()
    }
}
