//! # elite-console
//!
//! Operator console core for Elite: turns command lines into task
//! descriptors and drives interact sessions against the team server
//! collaborators.
//!
//! ## Features
//!
//! - Quoted and raw tokenizing with literal backslashes
//! - Parameter schema with static and session-derived value sets
//! - Stage/commit task compiler (`Set` / `Unset` / `Start`)
//! - Tagged-variant command catalogue with one shared validator
//! - Interact sessions with history reconciliation, confirmation and the
//!   `As` impersonation prefix

pub mod commands;
pub mod compiler;
pub mod console;
pub mod parser;
pub mod schema;
pub mod session;

// Parsing & schema
pub use parser::{tokenize, TokenMode};
pub use schema::{Arity, Parameter, ParameterValues, ValueProvider, ValueSource};

// Compilation
pub use commands::{Catalog, CommandAction, CommandSpec, CompileContext, Invocation, LocalAction};
pub use compiler::{PlanBuilder, StageOp, StagingTemplate, TaskCompiler, TaskPlan};

// Sessions
pub use console::{Console, HelpEntry, Reply, INTERACT_USAGE};
pub use session::{
    AgentSummary, InteractSession, Outcome, PendingTask, Remote, Submission, AS_USAGE,
};
