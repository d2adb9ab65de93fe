//! Interact Session - 한 에이전트에 대한 명령 실행 컨텍스트
//!
//! 세션은 에이전트, 자식 에이전트, 런처 목록, 태스킹 저장소, 기억된
//! PowerShell import를 소유한다. 원격 협력자는 `Remote` 번들로 주입되고
//! 명령은 `TaskCompiler`를 통해 컴파일된다.

use crate::commands::{Catalog, CommandAction, CompileContext, Invocation, LocalAction};
use crate::compiler::{TaskCompiler, TaskPlan};
use crate::parser::{command_word, strip_command_word, tokenize, TokenMode};
use crate::schema::{ValueProvider, ValueSource};
use elite_foundation::{Error, Result};
use elite_task::{
    Agent, AgentDirectory, AgentId, DataDirectory, HistoryReconciler, Launcher, LauncherCatalog,
    TaskDescriptor, TaskField, TaskKind, TaskQueue, TaskRecord, TaskStatus, TaskingDetail,
    TaskingId, TaskingStore,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Usage of the impersonation prefix
pub const AS_USAGE: &str = "As <task_command>";

// ============================================================================
// Collaborators
// ============================================================================

/// Remote collaborators a session talks to
#[derive(Clone)]
pub struct Remote {
    pub agents: Arc<dyn AgentDirectory>,
    pub queue: Arc<dyn TaskQueue>,
    pub detail: Arc<dyn TaskingDetail>,
    pub launchers: Arc<dyn LauncherCatalog>,
}

impl Remote {
    /// One client serving every collaborator role
    pub fn new<C>(client: Arc<C>) -> Self
    where
        C: AgentDirectory + TaskQueue + TaskingDetail + LauncherCatalog + 'static,
    {
        Self {
            agents: client.clone(),
            queue: client.clone(),
            detail: client.clone(),
            launchers: client,
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// A tasking accepted by the task queue
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: TaskingId,
    pub name: String,
    pub kind: TaskKind,
    pub token_task: bool,
}

/// What `Show` prints
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSummary {
    pub agent: Agent,
    pub children: Vec<String>,
    pub tasks_assigned: Vec<String>,
    pub tasks_completed: Vec<String>,
}

/// A compiled task waiting for the operator's confirmation
#[derive(Debug, Clone)]
pub struct PendingTask {
    question: String,
    task: TaskDescriptor,
}

impl PendingTask {
    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn task(&self) -> &TaskDescriptor {
        &self.task
    }
}

/// Result of one command line
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Empty input
    Nothing,
    Submitted(Submission),
    Show(AgentSummary),
    /// Records in display order
    History(Vec<TaskRecord>),
    Confirm(PendingTask),
    Aborted,
}

// ============================================================================
// Session
// ============================================================================

pub struct InteractSession {
    remote: Remote,
    data: Arc<dyn DataDirectory>,
    catalog: Arc<Catalog>,
    compiler: TaskCompiler,
    agent_id: AgentId,
    agent: Agent,
    children: Vec<Agent>,
    launchers: Vec<Launcher>,
    store: TaskingStore,
    powershell_import: String,
}

impl InteractSession {
    /// Look the agent up by name and load its state.
    pub async fn open(
        remote: Remote,
        data: Arc<dyn DataDirectory>,
        catalog: Arc<Catalog>,
        name: &str,
    ) -> Result<Self> {
        let agent = remote.agents.agent_by_name(name).await?;
        let agent_id = agent
            .id
            .ok_or_else(|| Error::Internal(format!("Grunt {} has no id", agent.name)))?;

        let mut session = Self {
            remote,
            data,
            catalog,
            compiler: TaskCompiler::new(),
            agent_id,
            agent,
            children: Vec::new(),
            launchers: Vec::new(),
            store: TaskingStore::new(),
            powershell_import: String::new(),
        };
        session.refresh().await?;
        info!(grunt = %session.agent.name, id = %agent_id, "Interact session opened");
        Ok(session)
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn name(&self) -> &str {
        &self.agent.name
    }

    pub fn children(&self) -> &[Agent] {
        &self.children
    }

    pub fn launchers(&self) -> &[Launcher] {
        &self.launchers
    }

    pub fn store(&self) -> &TaskingStore {
        &self.store
    }

    pub fn powershell_import(&self) -> &str {
        &self.powershell_import
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Re-fetch agent, children, launchers and run a full history refresh.
    /// Nothing is committed unless every fetch succeeds.
    pub async fn refresh(&mut self) -> Result<()> {
        let agent = self.remote.agents.agent_by_id(self.agent_id).await?;

        let mut children = Vec::with_capacity(agent.children.len());
        for guid in &agent.children {
            match self.remote.agents.agent_by_guid(guid).await {
                Ok(child) => children.push(child),
                Err(Error::NotFound(_)) => warn!(guid = %guid, "Child Grunt not found"),
                Err(e) => return Err(e),
            }
        }

        let launchers = self.remote.launchers.launchers().await?;

        let mut store = self.store.clone();
        HistoryReconciler::new(self.remote.detail.as_ref(), self.agent_id)
            .refresh_all(&mut store)
            .await?;

        self.agent = agent;
        self.children = children;
        self.launchers = launchers;
        self.store = store;
        Ok(())
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Run one command line.
    pub async fn execute(&mut self, line: &str) -> Result<Outcome> {
        let input = line.trim();
        if input.is_empty() {
            return Ok(Outcome::Nothing);
        }

        if command_word(input).eq_ignore_ascii_case("As") {
            let inner = strip_command_word(input);
            if inner.is_empty() {
                return Err(Error::usage(AS_USAGE, input));
            }
            return self.dispatch(inner, input, true).await;
        }
        self.dispatch(input, input, false).await
    }

    async fn dispatch(&mut self, input: &str, line: &str, as_token: bool) -> Result<Outcome> {
        let catalog = Arc::clone(&self.catalog);
        let word = command_word(input);
        let spec = catalog
            .find(word)
            .ok_or_else(|| Error::NotFound(format!("command \"{}\"", word)))?;
        let invocation = spec.parse(input, &*self)?;

        match spec.action {
            CommandAction::Local(LocalAction::Show | LocalAction::History) if as_token => {
                Err(Error::usage(AS_USAGE, line))
            }
            CommandAction::Local(LocalAction::Show) => self.show().await,
            CommandAction::Local(LocalAction::History) => self.history(&invocation).await,
            CommandAction::Local(LocalAction::PowerShellImport) => {
                self.powershell_import_file(&invocation, line, as_token).await
            }
            CommandAction::Local(LocalAction::Disconnect) => {
                self.disconnect(&invocation, line, as_token).await
            }
            CommandAction::Task { .. } => {
                let ctx = CompileContext {
                    data: self.data.as_ref(),
                    powershell_import: &self.powershell_import,
                };
                let mut plan = spec.compile(&invocation, &ctx)?;
                plan.token_task |= as_token;
                let task = self.compiler.compile(&plan, self.agent_id, line)?;

                if spec.confirm {
                    return Ok(Outcome::Confirm(PendingTask {
                        question: format!("{} Grunt: {}? [y/N] ", spec.name, self.agent.name),
                        task,
                    }));
                }
                self.submit(task).await
            }
        }
    }

    /// Submit a confirmed task; anything but `y`/`Y` aborts.
    pub async fn resolve(&mut self, pending: PendingTask, answer: &str) -> Result<Outcome> {
        if answer.trim_start().starts_with(|c: char| c.eq_ignore_ascii_case(&'y')) {
            self.submit(pending.task).await
        } else {
            debug!(name = %pending.task.name, "Tasking aborted by operator");
            Ok(Outcome::Aborted)
        }
    }

    async fn submit(&self, task: TaskDescriptor) -> Result<Outcome> {
        let id = self.remote.queue.submit(&task).await?;
        debug!(tasking = %id, name = %task.name, kind = %task.kind, "Tasking queued");
        Ok(Outcome::Submitted(Submission {
            id,
            name: task.name,
            kind: task.kind,
            token_task: task.token_task,
        }))
    }

    // ========================================================================
    // Local commands
    // ========================================================================

    async fn show(&mut self) -> Result<Outcome> {
        self.refresh().await?;
        Ok(Outcome::Show(self.summary()))
    }

    pub fn summary(&self) -> AgentSummary {
        let records = self.store.sorted();
        AgentSummary {
            agent: self.agent.clone(),
            children: self.children.iter().map(|c| c.name.clone()).collect(),
            tasks_assigned: records.iter().map(|r| r.name.clone()).collect(),
            tasks_completed: records
                .iter()
                .filter(|r| r.status == TaskStatus::Completed)
                .map(|r| r.name.clone())
                .collect(),
        }
    }

    async fn history(&mut self, invocation: &Invocation<'_>) -> Result<Outcome> {
        let reconciler = HistoryReconciler::new(self.remote.detail.as_ref(), self.agent_id);

        let Some(arg) = invocation.get(0) else {
            reconciler.refresh_all(&mut self.store).await?;
            return Ok(Outcome::History(
                self.store.sorted().into_iter().cloned().collect(),
            ));
        };

        let known = self.store.find_by_name(arg).map(|r| r.id);
        let id = match (known, arg.parse::<usize>()) {
            (Some(id), _) => id,
            (None, Ok(k)) => {
                return Ok(Outcome::History(reconciler.refresh_last(&mut self.store, k).await?));
            }
            (None, Err(_)) => {
                // the task may have been queued since the last refresh; the
                // refreshed copy is kept only if it knows the name
                let mut staged = self.store.clone();
                reconciler.refresh_all(&mut staged).await?;
                let Some(id) = staged.find_by_name(arg).map(|r| r.id) else {
                    return Err(Error::Validation(format!(
                        "Invalid History command. Usage is: {}\nValid completed TaskNames: {}",
                        invocation.spec.usage,
                        staged.names().join(", ")
                    )));
                };
                self.store = staged;
                id
            }
        };

        reconciler.refresh_one(&mut self.store, id).await?;
        Ok(Outcome::History(self.store.get(id).cloned().into_iter().collect()))
    }

    async fn powershell_import_file(
        &mut self,
        invocation: &Invocation<'_>,
        line: &str,
        as_token: bool,
    ) -> Result<Outcome> {
        let script = self.data.read_text(invocation.arg(0))?;
        let mut plan = TaskPlan::builder(TaskKind::PowerShell)
            .set(TaskField::PowerShellCommand, script.clone())
            .start();
        plan.token_task |= as_token;

        let task = self.compiler.compile(&plan, self.agent_id, line)?;
        let outcome = self.submit(task).await?;
        self.powershell_import = script;
        Ok(outcome)
    }

    async fn disconnect(&mut self, invocation: &Invocation<'_>, line: &str, as_token: bool) -> Result<Outcome> {
        let name = invocation.arg(0);
        let child = self
            .remote
            .agents
            .agent_by_name(name)
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => Error::NotFound(format!("Invalid GruntName selected: {}", name)),
                other => other,
            })?;
        if !self.agent.has_child(&child.guid) {
            return Err(Error::Validation(format!(
                "Grunt: \"{}\" is not a child Grunt",
                name
            )));
        }

        let mut plan = TaskPlan::builder(TaskKind::Disconnect)
            .set(TaskField::ChildGuid, child.guid)
            .start();
        plan.token_task |= as_token;
        let task = self.compiler.compile(&plan, self.agent_id, line)?;
        self.submit(task).await
    }

    // ========================================================================
    // Completion
    // ========================================================================

    /// Suggestions for the word being typed at the end of `input`
    pub fn completions(&self, input: &str) -> Vec<String> {
        let tokens = tokenize(input, TokenMode::Quoted);
        let fresh_word = input.is_empty() || input.ends_with(char::is_whitespace);

        if tokens.is_empty() || (tokens.len() == 1 && !fresh_word) {
            let prefix = tokens.first().map(|t| t.to_ascii_lowercase()).unwrap_or_default();
            return self
                .catalog
                .names()
                .into_iter()
                .filter(|n| n.to_ascii_lowercase().starts_with(&prefix))
                .map(str::to_string)
                .collect();
        }

        let Some(spec) = self.catalog.find(&tokens[0]) else {
            return Vec::new();
        };
        let (index, prefix) = if fresh_word {
            (tokens.len() - 1, "")
        } else {
            (tokens.len() - 2, tokens[tokens.len() - 1].as_str())
        };
        spec.parameters
            .get(index)
            .map(|p| p.suggestions(prefix, self))
            .unwrap_or_default()
    }
}

impl ValueProvider for InteractSession {
    fn values(&self, source: ValueSource) -> Vec<String> {
        match source {
            ValueSource::ChildAgents => self.children.iter().map(|c| c.name.clone()).collect(),
            ValueSource::Launchers => self.launchers.iter().map(|l| l.name.clone()).collect(),
            ValueSource::DataFiles => self.data.list().unwrap_or_default(),
            ValueSource::TaskNames => self.store.names(),
        }
    }
}
