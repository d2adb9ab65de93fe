//! History Reconciler - merges polled tasking results into a `TaskingStore`
//!
//! Every operation works on a staged copy of the store and commits only after
//! all remote calls succeeded, so a failed fetch leaves the store untouched.

use crate::remote::TaskingDetail;
use crate::store::{MergeOutcome, TaskingStore};
use crate::task::{AgentId, TaskRecord, TaskingId};
use elite_foundation::Result;
use tracing::debug;

/// Counts from one full refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub inserted: usize,
    pub replaced: usize,
    pub kept: usize,
}

impl MergeReport {
    fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Replaced => self.replaced += 1,
            MergeOutcome::Kept => self.kept += 1,
        }
    }
}

/// Reconciles one agent's taskings against the tasking detail service.
pub struct HistoryReconciler<'a> {
    detail: &'a dyn TaskingDetail,
    agent: AgentId,
}

impl<'a> HistoryReconciler<'a> {
    pub fn new(detail: &'a dyn TaskingDetail, agent: AgentId) -> Self {
        Self { detail, agent }
    }

    // ========================================================================
    // Full refresh
    // ========================================================================

    /// Fetch the full remote list and merge every record.
    /// Records that vanished remotely are kept.
    pub async fn refresh_all(&self, store: &mut TaskingStore) -> Result<MergeReport> {
        let remote = self.detail.list(self.agent).await?;
        let report = Self::merge_all(store, remote);
        debug!(
            agent = %self.agent,
            inserted = report.inserted,
            replaced = report.replaced,
            kept = report.kept,
            "History refreshed"
        );
        Ok(report)
    }

    fn merge_all(store: &mut TaskingStore, remote: Vec<TaskRecord>) -> MergeReport {
        let mut report = MergeReport::default();
        for record in remote {
            report.record(store.merge(record));
        }
        report
    }

    // ========================================================================
    // Single refresh
    // ========================================================================

    /// Full refresh, then fetch the detail of `id` if its output is still
    /// empty and splice it into the same position.
    pub async fn refresh_one(&self, store: &mut TaskingStore, id: TaskingId) -> Result<()> {
        let mut staged = store.clone();
        self.refresh_one_staged(&mut staged, id).await?;
        *store = staged;
        Ok(())
    }

    async fn refresh_one_staged(&self, staged: &mut TaskingStore, id: TaskingId) -> Result<()> {
        let remote = self.detail.list(self.agent).await?;
        Self::merge_all(staged, remote);

        let needs_detail = staged.get(id).map(|r| !r.has_output()).unwrap_or(false);
        if !needs_detail {
            return Ok(());
        }

        let fuller = self.detail.detail(self.agent, id).await?;
        let outcome = staged.merge(fuller);
        debug!(agent = %self.agent, tasking = %id, ?outcome, "Tasking detail merged");
        Ok(())
    }

    // ========================================================================
    // Last K
    // ========================================================================

    /// Sample the `k` most recently completed records, refresh each one in
    /// order, then report the last `k` of the refreshed state.
    pub async fn refresh_last(&self, store: &mut TaskingStore, k: usize) -> Result<Vec<TaskRecord>> {
        let sample: Vec<TaskingId> = store.last(k).iter().map(|r| r.id).collect();

        let mut staged = store.clone();
        for id in sample {
            self.refresh_one_staged(&mut staged, id).await?;
        }
        *store = staged;

        Ok(store.last(k).into_iter().cloned().collect())
    }
}
