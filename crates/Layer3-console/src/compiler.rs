//! Task Compiler - stage/commit protocol
//!
//! 모든 태스크 명령은 `TaskPlan`(Set/Unset 연산 + 마지막 Start 하나)으로
//! 컴파일되고, `TaskCompiler`가 이를 스테이징 템플릿에 적용해 불변
//! `TaskDescriptor`를 만든다.

use elite_foundation::{Error, Result};
use elite_task::{new_task_name, AgentId, TaskDescriptor, TaskField, TaskKind, TaskStatus};
use tracing::debug;

/// Pipe name used by `Connect` when none is given
pub const DEFAULT_PIPE_NAME: &str = "gruntsvc";

// ============================================================================
// Plan
// ============================================================================

/// Primitive staging operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOp {
    Set(TaskField, String),
    Unset(TaskField),
    Start,
}

/// Compiled form of one task command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPlan {
    pub kind: TaskKind,
    pub token_task: bool,
    pub ops: Vec<StageOp>,
}

impl TaskPlan {
    pub fn builder(kind: TaskKind) -> PlanBuilder {
        PlanBuilder {
            kind,
            token_task: kind.is_token(),
            ops: Vec::new(),
        }
    }

    /// Staged `Set` operations in order
    pub fn sets(&self) -> Vec<(TaskField, &str)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                StageOp::Set(field, value) => Some((*field, value.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Builds a `TaskPlan`; `start()` appends the single `Start`.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    kind: TaskKind,
    token_task: bool,
    ops: Vec<StageOp>,
}

impl PlanBuilder {
    pub fn set(mut self, field: TaskField, value: impl Into<String>) -> Self {
        self.ops.push(StageOp::Set(field, value.into()));
        self
    }

    /// `Set` when `value` is present, otherwise nothing
    pub fn set_some(self, field: TaskField, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.set(field, value),
            None => self,
        }
    }

    pub fn unset(mut self, field: TaskField) -> Self {
        self.ops.push(StageOp::Unset(field));
        self
    }

    /// Run under an impersonated identity
    pub fn token(mut self) -> Self {
        self.token_task = true;
        self
    }

    pub fn start(mut self) -> TaskPlan {
        self.ops.push(StageOp::Start);
        TaskPlan {
            kind: self.kind,
            token_task: self.token_task,
            ops: self.ops,
        }
    }
}

// ============================================================================
// Staging template
// ============================================================================

/// Mutable template the plan operations are applied to
#[derive(Debug, Clone, PartialEq)]
pub struct StagingTemplate {
    kind: TaskKind,
    token_task: bool,
    fields: Vec<(TaskField, String)>,
    cleared: Vec<TaskField>,
}

impl StagingTemplate {
    pub fn new(kind: TaskKind, token_task: bool) -> Self {
        Self {
            kind,
            token_task: token_task || kind.is_token(),
            fields: Vec::new(),
            cleared: Vec::new(),
        }
    }

    /// Re-setting a field replaces its value in place.
    pub fn set(&mut self, field: TaskField, value: String) {
        self.cleared.retain(|f| *f != field);
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn unset(&mut self, field: TaskField) {
        self.fields.retain(|(f, _)| *f != field);
        if !self.cleared.contains(&field) {
            self.cleared.push(field);
        }
    }

    pub fn get(&self, field: TaskField) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Payload carried by control kinds
    fn message(&self) -> String {
        let field = |f| self.get(f).unwrap_or_default().to_string();
        match self.kind {
            TaskKind::SetDelay => field(TaskField::Delay),
            TaskKind::SetJitter => field(TaskField::JitterPercent),
            TaskKind::SetConnectAttempts => field(TaskField::ConnectAttempts),
            TaskKind::Connect => format!(
                "{},{}",
                field(TaskField::ComputerName),
                self.get(TaskField::PipeName).unwrap_or(DEFAULT_PIPE_NAME)
            ),
            TaskKind::Disconnect => field(TaskField::ChildGuid),
            TaskKind::Jobs => "Jobs".to_string(),
            _ => String::new(),
        }
    }

    /// Freeze into an immutable descriptor
    fn start(self, agent: AgentId, command: &str) -> TaskDescriptor {
        let message = self.message();
        TaskDescriptor {
            id: None,
            agent_id: agent,
            name: new_task_name(),
            kind: self.kind,
            message,
            command: command.to_string(),
            status: TaskStatus::Uninitialized,
            token_task: self.token_task,
            options: self.fields,
            cleared: self.cleared,
        }
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Applies plans to a fresh staging template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskCompiler;

impl TaskCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile `plan` into a descriptor for `agent`. `command` is the raw
    /// operator input recorded on the descriptor.
    pub fn compile(&self, plan: &TaskPlan, agent: AgentId, command: &str) -> Result<TaskDescriptor> {
        let starts = plan.ops.iter().filter(|op| **op == StageOp::Start).count();
        if starts != 1 || plan.ops.last() != Some(&StageOp::Start) {
            return Err(Error::Internal(format!(
                "{} plan must end with exactly one Start",
                plan.kind
            )));
        }

        let mut template = StagingTemplate::new(plan.kind, plan.token_task);
        for op in &plan.ops {
            match op {
                StageOp::Set(field, value) => template.set(*field, value.clone()),
                StageOp::Unset(field) => template.unset(*field),
                StageOp::Start => {}
            }
        }

        let descriptor = template.start(agent, command);
        debug!(
            kind = %descriptor.kind,
            name = %descriptor.name,
            options = descriptor.options.len(),
            token = descriptor.token_task,
            "Task compiled"
        );
        Ok(descriptor)
    }
}
