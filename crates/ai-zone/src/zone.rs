use core::fmt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, Weak};

use ai_core::{Agent, AgentId, AgentPtr, NodeStateStore, TickContext, ZoneHandle};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::group::GroupMgr;
use crate::pool::{TaskHandle, ThreadPool};

/// Zone settings.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ZoneConfig {
    /// Unique name; the debug server selects zones by it.
    pub name: String,
    /// Worker threads used for agent updates.
    #[cfg_attr(feature = "serde", serde(default = "default_threads"))]
    pub threads: usize,
}

fn default_threads() -> usize {
    1
}

impl ZoneConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            threads: default_threads(),
        }
    }
}

/// An agent plus the node state of its tree. The state lives here, next to the agent, and is
/// dropped together with the membership.
struct Member {
    agent: AgentPtr,
    states: Arc<Mutex<NodeStateStore>>,
}

#[derive(Default)]
struct Schedule {
    add: Vec<AgentPtr>,
    remove: Vec<AgentId>,
}

/// A group of agents updated together.
///
/// Membership changes are queued and applied at the start of the next [`Zone::update`], so
/// they are safe to request from inside a running tick. Agents point back at their zone
/// weakly; see [`Zone::of`].
pub struct Zone {
    name: String,
    me: Weak<Zone>,
    agents: RwLock<HashMap<AgentId, Member>>,
    schedule: Mutex<Schedule>,
    groups: GroupMgr,
    debug: AtomicBool,
    pool: ThreadPool,
}

impl Zone {
    pub fn new(name: impl Into<String>, threads: usize) -> Arc<Self> {
        let name = name.into();
        let pool = ThreadPool::new(format!("zone-{name}"), threads);
        Arc::new_cyclic(|me| Self {
            name,
            me: me.clone(),
            agents: RwLock::new(HashMap::new()),
            schedule: Mutex::new(Schedule::default()),
            groups: GroupMgr::new(),
            debug: AtomicBool::new(false),
            pool,
        })
    }

    pub fn from_config(config: &ZoneConfig) -> Arc<Self> {
        Self::new(config.name.clone(), config.threads)
    }

    /// The zone `agent` currently lives in.
    pub fn of(agent: &Agent) -> Option<Arc<Zone>> {
        agent.zone()?.downcast::<Zone>().ok()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group_mgr(&self) -> &GroupMgr {
        &self.groups
    }

    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Release);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Acquire)
    }

    /// Queues `agent` for insertion. Returns `false` if it is already queued.
    pub fn add_agent(&self, agent: AgentPtr) -> bool {
        let mut schedule = self.schedule();
        if schedule.add.iter().any(|a| a.id() == agent.id()) {
            return false;
        }
        schedule.add.push(agent);
        true
    }

    /// Queues the removal of `id`. Returns `false` if it is already queued.
    pub fn remove_agent(&self, id: AgentId) -> bool {
        let mut schedule = self.schedule();
        if schedule.remove.contains(&id) {
            return false;
        }
        schedule.remove.push(id);
        true
    }

    /// Applies queued membership changes, then executes the tree of every agent that is not
    /// paused, at most once each, and refreshes group positions. Blocks until all agents are
    /// done.
    pub fn update(&self, delta_millis: i64) {
        self.apply_schedule();

        let debugging = self.is_debug();
        let handles: Vec<TaskHandle<()>> = self
            .agents()
            .values()
            .map(|member| {
                let agent = member.agent.clone();
                let states = member.states.clone();
                self.pool.enqueue(move || {
                    if agent.is_paused() {
                        return;
                    }
                    tick(&agent, &states, delta_millis, debugging);
                })
            })
            .collect();
        for handle in handles {
            handle.wait();
        }
        self.groups.update();
    }

    /// Runs one tick on every paused agent and leaves it paused.
    pub fn step(&self, delta_millis: i64) {
        let debugging = self.is_debug();
        self.execute_parallel(move |agent, states| {
            if !agent.is_paused() {
                return;
            }
            tick(agent, states, delta_millis, debugging);
        });
    }

    /// Drops the node state of every agent so its tree starts from scratch.
    pub fn reset_agent_states(&self) {
        self.execute_parallel(|agent, states| {
            let mut states = lock(states);
            match agent.behaviour() {
                Some(root) => root.reset_state(&mut states),
                None => states.clear(),
            }
        });
    }

    pub fn get(&self, id: AgentId) -> Option<AgentPtr> {
        self.agents().get(&id).map(|m| m.agent.clone())
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents().contains_key(&id)
    }

    /// Active agents. Queued additions are not counted.
    pub fn size(&self) -> usize {
        self.agents().len()
    }

    /// Calls `f` for every agent on the calling thread.
    pub fn execute<F>(&self, mut f: F)
    where
        F: FnMut(&AgentPtr),
    {
        for member in self.agents().values() {
            f(&member.agent);
        }
    }

    /// Calls `f` for every agent on the pool and waits for all of them. `f` gets the agent's
    /// node state, locked by the caller only for as long as it needs.
    pub fn execute_parallel<F>(&self, f: F)
    where
        F: Fn(&AgentPtr, &Mutex<NodeStateStore>) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let handles: Vec<TaskHandle<()>> = self
            .agents()
            .values()
            .map(|member| {
                let (f, agent, states) = (f.clone(), member.agent.clone(), member.states.clone());
                self.pool.enqueue(move || f(&agent, &states))
            })
            .collect();
        for handle in handles {
            handle.wait();
        }
    }

    /// Schedules `f` for agent `id` on the pool without waiting. `None` if the agent is not
    /// in this zone.
    pub fn execute_async<F, R>(&self, id: AgentId, f: F) -> Option<TaskHandle<R>>
    where
        F: FnOnce(&AgentPtr) -> R + Send + 'static,
        R: Send + 'static,
    {
        let agent = self.get(id)?;
        Some(self.pool.enqueue(move || f(&agent)))
    }

    /// Reads an agent together with its node state.
    pub fn with_agent_state<R>(
        &self,
        id: AgentId,
        f: impl FnOnce(&AgentPtr, &NodeStateStore) -> R,
    ) -> Option<R> {
        let agents = self.agents();
        let member = agents.get(&id)?;
        let states = lock(&member.states);
        Some(f(&member.agent, &states))
    }

    fn apply_schedule(&self) {
        let Schedule { add, remove } = std::mem::take(&mut *self.schedule());
        if add.is_empty() && remove.is_empty() {
            return;
        }

        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        for agent in add {
            let id = agent.id();
            if agents.contains_key(&id) {
                warn!(zone = %self.name, agent = %id, "agent is already in the zone");
                continue;
            }
            debug!(zone = %self.name, agent = %id, "agent added");
            let handle: ZoneHandle = self.me.clone();
            agent.set_zone(Some(handle));
            agents.insert(
                id,
                Member {
                    agent,
                    states: Arc::new(Mutex::new(NodeStateStore::new())),
                },
            );
        }
        for id in remove {
            if let Some(member) = agents.remove(&id) {
                member.agent.set_zone(None);
                self.groups.remove_from_all_groups(id);
                debug!(zone = %self.name, agent = %id, "agent removed");
            } else {
                trace!(zone = %self.name, agent = %id, "removed agent was not in the zone");
            }
        }
    }

    fn agents(&self) -> RwLockReadGuard<'_, HashMap<AgentId, Member>> {
        self.agents.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zone")
            .field("name", &self.name)
            .field("agents", &self.size())
            .field("debug", &self.is_debug())
            .field("threads", &self.pool.threads())
            .finish()
    }
}

fn lock(states: &Mutex<NodeStateStore>) -> MutexGuard<'_, NodeStateStore> {
    states.lock().unwrap_or_else(PoisonError::into_inner)
}

fn tick(agent: &AgentPtr, states: &Mutex<NodeStateStore>, delta_millis: i64, debugging: bool) {
    agent.update(delta_millis, debugging);
    let Some(root) = agent.behaviour() else {
        return;
    };
    let mut states = lock(states);
    root.execute(&mut TickContext::new(agent, &mut states, delta_millis));
}
