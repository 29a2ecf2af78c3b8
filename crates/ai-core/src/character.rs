use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

pub type CharacterPtr = Arc<dyn Character>;

/// The world entity an agent controls.
///
/// Implemented by the game world. Conditions and steerings read attributes and the
/// position through it; filters use [`Character::visit_visible`]. Scripts may write through
/// the setters, which a world that drives movement itself can leave as no-ops.
pub trait Character: Send + Sync {
    fn id(&self) -> AgentId;

    fn position(&self) -> Vec3;

    fn orientation(&self) -> f32 {
        0.0
    }

    fn speed(&self) -> f32 {
        0.0
    }

    fn attributes(&self) -> BTreeMap<String, String>;

    fn attribute(&self, key: &str) -> Option<String> {
        self.attributes().remove(key)
    }

    fn set_position(&self, _position: Vec3) {}

    fn set_orientation(&self, _orientation: f32) {}

    fn set_speed(&self, _speed: f32) {}

    /// Sets a key/value pair shown by the debugger.
    fn set_attribute(&self, _key: &str, _value: &str) {}

    /// Calls `visitor` once for every entity this character can currently see.
    fn visit_visible(&self, _visitor: &mut dyn FnMut(AgentId)) {}

    /// Called by the agent before its tree runs.
    fn update(&self, _delta_millis: i64, _debugging: bool) {}
}

#[derive(Debug, Default)]
struct CharacterData {
    position: Vec3,
    orientation: f32,
    speed: f32,
    attributes: BTreeMap<String, String>,
    visible: Vec<AgentId>,
}

/// In-memory [`Character`] for tools, tests and the runner.
#[derive(Debug)]
pub struct BasicCharacter {
    id: AgentId,
    data: RwLock<CharacterData>,
}

impl BasicCharacter {
    pub fn new(id: impl Into<AgentId>) -> Self {
        Self {
            id: id.into(),
            data: RwLock::new(CharacterData::default()),
        }
    }

    pub fn set_visible(&self, visible: Vec<AgentId>) {
        self.write(|d| d.visible = visible);
    }

    fn write(&self, f: impl FnOnce(&mut CharacterData)) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut data);
    }

    fn read<R>(&self, f: impl FnOnce(&CharacterData) -> R) -> R {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        f(&data)
    }
}

impl Character for BasicCharacter {
    fn id(&self) -> AgentId {
        self.id
    }

    fn position(&self) -> Vec3 {
        self.read(|d| d.position)
    }

    fn orientation(&self) -> f32 {
        self.read(|d| d.orientation)
    }

    fn speed(&self) -> f32 {
        self.read(|d| d.speed)
    }

    fn attributes(&self) -> BTreeMap<String, String> {
        self.read(|d| d.attributes.clone())
    }

    fn attribute(&self, key: &str) -> Option<String> {
        self.read(|d| d.attributes.get(key).cloned())
    }

    fn set_position(&self, position: Vec3) {
        self.write(|d| d.position = position);
    }

    fn set_orientation(&self, orientation: f32) {
        self.write(|d| d.orientation = orientation);
    }

    fn set_speed(&self, speed: f32) {
        self.write(|d| d.speed = speed);
    }

    fn set_attribute(&self, key: &str, value: &str) {
        self.write(|d| {
            d.attributes.insert(key.to_string(), value.to_string());
        });
    }

    fn visit_visible(&self, visitor: &mut dyn FnMut(AgentId)) {
        let visible = self.read(|d| d.visible.clone());
        for id in visible {
            visitor(id);
        }
    }
}
