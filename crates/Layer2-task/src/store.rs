//! Tasking Store - 에이전트별 tasking 로컬 캐시
//!
//! 레코드는 도착 순서대로 보관하고, id로 교체할 때는 같은 위치를 유지한다.
//! 표시 순서는 완료 시각 기준 (`sorted`).

use crate::task::{TaskRecord, TaskingId};

/// Result of merging one remote copy into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// New id, appended
    Inserted,
    /// Existing id, replaced in place
    Replaced,
    /// Local copy kept (final, or remote copy is behind)
    Kept,
}

/// Local cache of task records for a single agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskingStore {
    records: Vec<TaskRecord>,
}

impl TaskingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in arrival order
    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    pub fn get(&self, id: TaskingId) -> Option<&TaskRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn position(&self, id: TaskingId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Case-insensitive lookup by tasking name
    pub fn find_by_name(&self, name: &str) -> Option<&TaskRecord> {
        self.records
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<String> {
        self.sorted().into_iter().map(|r| r.name.clone()).collect()
    }

    /// Display order: completion time ascending (unfinished first), then id.
    pub fn sorted(&self) -> Vec<&TaskRecord> {
        let mut sorted: Vec<&TaskRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| {
            a.completion_time
                .cmp(&b.completion_time)
                .then(a.id.cmp(&b.id))
        });
        sorted
    }

    /// The `k` records with the greatest completion time, in display order.
    pub fn last(&self, k: usize) -> Vec<&TaskRecord> {
        let sorted = self.sorted();
        let skip = sorted.len().saturating_sub(k);
        sorted.into_iter().skip(skip).collect()
    }

    /// Merge a remote copy.
    ///
    /// A local record that is final (Completed with output) is never touched,
    /// and a remote copy whose status is behind the local one is ignored.
    /// Otherwise the record is replaced at its current position, or appended
    /// when the id is new.
    pub fn merge(&mut self, incoming: TaskRecord) -> MergeOutcome {
        match self.position(incoming.id) {
            Some(index) => {
                let local = &self.records[index];
                if local.is_final() || incoming.status < local.status {
                    MergeOutcome::Kept
                } else {
                    self.records[index] = incoming;
                    MergeOutcome::Replaced
                }
            }
            None => {
                self.records.push(incoming);
                MergeOutcome::Inserted
            }
        }
    }
}
