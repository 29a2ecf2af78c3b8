use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{AgentPtr, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MoveVector {
    pub vec: Vec3,
    pub rotation: f32,
}

impl MoveVector {
    pub const fn new(vec: Vec3, rotation: f32) -> Self {
        Self { vec, rotation }
    }
}

pub type SteeringPtr = Arc<dyn Steering>;

/// Produces a desired movement for an agent. Applying it is up to the caller.
pub trait Steering: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, agent: &AgentPtr, speed: f32) -> MoveVector;
}
