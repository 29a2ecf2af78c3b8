//! Per-agent aggro list.
//!
//! Every entry is the aggro an agent holds against another character. Entries decay over
//! time according to the configured [`AggroReduction`] and drop out once they reach zero.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::AgentId;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AggroEntry {
    pub id: AgentId,
    pub aggro: f32,
}

/// How aggro decays in [`AggroMgr::update`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AggroReduction {
    #[default]
    None,
    /// Multiplies by `1 - ratio_per_second * seconds`; values under `min_aggro` drop to zero.
    Ratio { ratio_per_second: f32, min_aggro: f32 },
    /// Subtracts `value_per_second * seconds`.
    Value { value_per_second: f32 },
}

/// Aggro entries ordered by value, highest first. Equal values keep insertion order.
#[derive(Debug, Default, Clone)]
pub struct AggroMgr {
    entries: Vec<AggroEntry>,
    reduction: AggroReduction,
}

impl AggroMgr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to the aggro against `id` and returns the new value.
    pub fn add_aggro(&mut self, id: AgentId, amount: f32) -> f32 {
        let aggro = match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.aggro += amount;
                entry.aggro
            }
            None => {
                self.entries.push(AggroEntry { id, aggro: amount });
                amount
            }
        };
        self.sort();
        aggro
    }

    pub fn aggro(&self, id: AgentId) -> Option<f32> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.aggro)
    }

    pub fn highest_entry(&self) -> Option<AggroEntry> {
        self.entries.first().copied()
    }

    pub fn entries(&self) -> &[AggroEntry] {
        &self.entries
    }

    pub fn remove(&mut self, id: AgentId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reduction(&self) -> AggroReduction {
        self.reduction
    }

    pub fn set_reduce_by_ratio(&mut self, ratio_per_second: f32, min_aggro: f32) {
        self.reduction = AggroReduction::Ratio {
            ratio_per_second,
            min_aggro,
        };
    }

    pub fn set_reduce_by_value(&mut self, value_per_second: f32) {
        self.reduction = AggroReduction::Value { value_per_second };
    }

    /// Stops decay. Existing values are kept.
    pub fn reset_reduce_value(&mut self) {
        self.reduction = AggroReduction::None;
    }

    /// Applies decay for `delta_millis` and drops entries that reached zero.
    pub fn update(&mut self, delta_millis: i64) {
        let seconds = delta_millis as f32 / 1000.0;
        match self.reduction {
            AggroReduction::None => return,
            AggroReduction::Ratio {
                ratio_per_second,
                min_aggro,
            } => {
                let factor = (1.0 - ratio_per_second * seconds).max(0.0);
                for entry in &mut self.entries {
                    entry.aggro *= factor;
                    if entry.aggro < min_aggro {
                        entry.aggro = 0.0;
                    }
                }
            }
            AggroReduction::Value { value_per_second } => {
                let amount = value_per_second * seconds;
                for entry in &mut self.entries {
                    entry.aggro = (entry.aggro - amount).max(0.0);
                }
            }
        }
        self.entries.retain(|e| e.aggro > 0.0);
        self.sort();
    }

    fn sort(&mut self) {
        self.entries.sort_by(|a, b| b.aggro.total_cmp(&a.aggro));
    }
}
