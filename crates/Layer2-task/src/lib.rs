//! # elite-task
//!
//! Tasking model and history reconciliation for Elite.
//!
//! ## Features
//!
//! - Task descriptors, task kinds and stageable fields
//! - Forward-only tasking status machine
//! - Per-agent tasking store with in-place replacement
//! - History reconciliation (full, single, last K) with non-regression
//! - Collaborator traits for the agent directory, task queue, tasking
//!   detail service, launcher catalog and local data directory

pub mod history;
pub mod remote;
pub mod state;
pub mod store;
pub mod task;

// Task model
pub use state::TaskStatus;
pub use task::{
    new_task_name, Agent, AgentId, Launcher, TaskDescriptor, TaskField, TaskKind, TaskRecord,
    TaskingId, TaskingType,
};

// Store & reconciliation
pub use history::{HistoryReconciler, MergeReport};
pub use store::{MergeOutcome, TaskingStore};

// Collaborators
pub use remote::{
    AgentDirectory, DataDirectory, LauncherCatalog, LocalDataDirectory, TaskQueue, TaskingDetail,
};
