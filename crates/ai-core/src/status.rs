use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of executing a node for one agent on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TreeNodeStatus {
    /// The node's condition denied execution.
    #[default]
    CannotExecute,
    Running,
    Finished,
    Failed,
}

impl TreeNodeStatus {
    /// Numeric code used by scripts and the debug protocol.
    pub fn code(self) -> i32 {
        match self {
            TreeNodeStatus::CannotExecute => 1,
            TreeNodeStatus::Running => 2,
            TreeNodeStatus::Finished => 3,
            TreeNodeStatus::Failed => 4,
        }
    }

    /// Inverse of [`TreeNodeStatus::code`]. Unknown (0), exception (5) and anything out of
    /// range map to `Failed`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => TreeNodeStatus::CannotExecute,
            2 => TreeNodeStatus::Running,
            3 => TreeNodeStatus::Finished,
            _ => TreeNodeStatus::Failed,
        }
    }

    pub fn is_running(self) -> bool {
        self == TreeNodeStatus::Running
    }
}

impl fmt::Display for TreeNodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TreeNodeStatus::CannotExecute => "CANNOTEXECUTE",
            TreeNodeStatus::Running => "RUNNING",
            TreeNodeStatus::Finished => "FINISHED",
            TreeNodeStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}
