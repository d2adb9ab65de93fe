//! Tasking status machine

use serde::{Deserialize, Serialize};

/// Lifecycle of a tasking. Totally ordered; a record only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Built locally, not yet accepted by the task queue
    #[default]
    Uninitialized,

    /// Accepted by the queue, waiting for the agent to pick it up
    #[serde(rename = "Tasked", alias = "Queued")]
    Queued,

    /// Picked up by the agent
    Progressed,

    /// Output reported back (terminal)
    Completed,
}

impl TaskStatus {
    const ORDER: [TaskStatus; 4] = [
        TaskStatus::Uninitialized,
        TaskStatus::Queued,
        TaskStatus::Progressed,
        TaskStatus::Completed,
    ];

    /// Check if this is a terminal state (cannot transition further)
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Move forward to `next`. Regressions are refused; returns whether the
    /// status changed.
    pub fn advance(&mut self, next: TaskStatus) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }

    /// Wire name used by the team server
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskStatus::Uninitialized => "Uninitialized",
            TaskStatus::Queued => "Tasked",
            TaskStatus::Progressed => "Progressed",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Numeric form used by older server builds
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ORDER.get(i).copied())
    }

    /// Case-insensitive parse of the wire name (`Queued` accepted as well).
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("queued") {
            return Some(TaskStatus::Queued);
        }
        Self::ORDER
            .into_iter()
            .find(|s| s.display_name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
