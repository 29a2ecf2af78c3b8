//! Agent groups within one zone.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ai_core::{AgentId, AgentPtr, Vec3};
use tracing::debug;

pub type GroupId = i32;

struct Group {
    /// Join order; the first member leads.
    members: Vec<AgentPtr>,
    /// Average member position as of the last recalculation.
    position: Vec3,
}

impl Group {
    fn recalculate(&mut self) {
        let count = self.members.len().max(1) as f32;
        let sum = self.members.iter().fold(Vec3::ZERO, |acc, member| {
            let p = member.character().position();
            Vec3::new(acc.x + p.x, acc.y + p.y, acc.z + p.z)
        });
        self.position = Vec3::new(sum.x / count, sum.y / count, sum.z / count);
    }

    fn contains(&self, id: AgentId) -> bool {
        self.members.iter().any(|m| m.id() == id)
    }
}

/// Groups of agents, keyed by a caller-chosen id.
///
/// A group exists while it has members. The first agent added leads it; when the leader
/// leaves, the next member in join order takes over. Group positions are the average of the
/// member positions, refreshed on membership changes and by [`GroupMgr::update`].
#[derive(Default)]
pub struct GroupMgr {
    groups: RwLock<BTreeMap<GroupId, Group>>,
}

impl GroupMgr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the agent already is a member.
    pub fn add(&self, group: GroupId, agent: &AgentPtr) -> bool {
        let mut groups = self.write();
        let entry = groups.entry(group).or_insert_with(|| Group {
            members: Vec::new(),
            position: Vec3::ZERO,
        });
        if entry.contains(agent.id()) {
            return false;
        }
        entry.members.push(agent.clone());
        entry.recalculate();
        debug!(group, agent = %agent.id(), size = entry.members.len(), "group member added");
        true
    }

    /// Returns `false` if the agent was not a member. Empty groups are dropped.
    pub fn remove(&self, group: GroupId, id: AgentId) -> bool {
        let mut groups = self.write();
        let Some(entry) = groups.get_mut(&group) else {
            return false;
        };
        let before = entry.members.len();
        entry.members.retain(|m| m.id() != id);
        if entry.members.len() == before {
            return false;
        }
        if entry.members.is_empty() {
            groups.remove(&group);
        } else {
            entry.recalculate();
        }
        debug!(group, agent = %id, "group member removed");
        true
    }

    /// Removes the agent from every group it is in. Returns how many groups that were.
    pub fn remove_from_all_groups(&self, id: AgentId) -> usize {
        let mut groups = self.write();
        let mut removed = 0;
        groups.retain(|_, group| {
            let before = group.members.len();
            group.members.retain(|m| m.id() != id);
            if group.members.len() != before {
                removed += 1;
                group.recalculate();
            }
            !group.members.is_empty()
        });
        removed
    }

    pub fn is_group_leader(&self, group: GroupId, id: AgentId) -> bool {
        self.read()
            .get(&group)
            .and_then(|g| g.members.first())
            .is_some_and(|leader| leader.id() == id)
    }

    pub fn is_in_group(&self, group: GroupId, id: AgentId) -> bool {
        self.read().get(&group).is_some_and(|g| g.contains(id))
    }

    pub fn is_in_any_group(&self, id: AgentId) -> bool {
        self.read().values().any(|g| g.contains(id))
    }

    /// Member count, `0` for unknown groups.
    pub fn group_size(&self, group: GroupId) -> usize {
        self.read().get(&group).map_or(0, |g| g.members.len())
    }

    pub fn leader(&self, group: GroupId) -> Option<AgentPtr> {
        self.read().get(&group).and_then(|g| g.members.first().cloned())
    }

    /// Members in join order.
    pub fn members(&self, group: GroupId) -> Vec<AgentPtr> {
        self.read()
            .get(&group)
            .map(|g| g.members.clone())
            .unwrap_or_default()
    }

    /// Average member position. `None` for unknown groups.
    pub fn position(&self, group: GroupId) -> Option<Vec3> {
        self.read().get(&group).map(|g| g.position)
    }

    pub fn group_ids(&self) -> Vec<GroupId> {
        self.read().keys().copied().collect()
    }

    /// Refreshes every group position.
    pub fn update(&self) {
        for group in self.write().values_mut() {
            group.recalculate();
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<GroupId, Group>> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<GroupId, Group>> {
        self.groups.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for GroupMgr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupMgr")
            .field("groups", &self.group_ids())
            .finish()
    }
}
