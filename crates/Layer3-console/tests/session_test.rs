//! Interact session tests against an in-memory team server

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use elite_console::{Console, InteractSession, Catalog, Outcome, Remote, Reply};
use elite_foundation::{Error, Result};
use elite_task::{
    Agent, AgentDirectory, AgentId, DataDirectory, Launcher, LauncherCatalog, LocalDataDirectory,
    TaskDescriptor, TaskField, TaskKind, TaskQueue, TaskRecord, TaskStatus, TaskingDetail,
    TaskingId, TaskingType,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Fake team server
// ============================================================================

#[derive(Default)]
struct FakeServer {
    agents: Mutex<Vec<Agent>>,
    launchers: Vec<Launcher>,
    taskings: Mutex<Vec<TaskRecord>>,
    details: Mutex<Vec<TaskRecord>>,
    submitted: Mutex<Vec<TaskDescriptor>>,
    calls: AtomicUsize,
    fail_submit: bool,
}

impl FakeServer {
    fn call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn submitted(&self) -> Vec<TaskDescriptor> {
        self.submitted.lock().unwrap().clone()
    }

    fn find(&self, pred: impl Fn(&Agent) -> bool, what: &str) -> Result<Agent> {
        self.agents
            .lock()
            .unwrap()
            .iter()
            .find(|a| pred(a))
            .cloned()
            .ok_or_else(|| Error::NotFound(what.to_string()))
    }
}

#[async_trait]
impl AgentDirectory for FakeServer {
    async fn agents(&self) -> Result<Vec<Agent>> {
        self.call();
        Ok(self.agents.lock().unwrap().clone())
    }

    async fn agent_by_id(&self, id: AgentId) -> Result<Agent> {
        self.call();
        self.find(|a| a.id == Some(id), "id")
    }

    async fn agent_by_name(&self, name: &str) -> Result<Agent> {
        self.call();
        self.find(|a| a.name == name, name)
    }

    async fn agent_by_guid(&self, guid: &str) -> Result<Agent> {
        self.call();
        self.find(|a| a.guid == guid, guid)
    }
}

#[async_trait]
impl TaskQueue for FakeServer {
    async fn submit(&self, task: &TaskDescriptor) -> Result<TaskingId> {
        self.call();
        if self.fail_submit {
            return Err(Error::Remote("Invalid GruntTask".into()));
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(task.clone());
        Ok(TaskingId(100 + submitted.len() as i32))
    }
}

#[async_trait]
impl TaskingDetail for FakeServer {
    async fn list(&self, _agent: AgentId) -> Result<Vec<TaskRecord>> {
        self.call();
        Ok(self.taskings.lock().unwrap().clone())
    }

    async fn detail(&self, _agent: AgentId, id: TaskingId) -> Result<TaskRecord> {
        self.call();
        self.details
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("tasking {}", id)))
    }
}

#[async_trait]
impl LauncherCatalog for FakeServer {
    async fn launchers(&self) -> Result<Vec<Launcher>> {
        self.call();
        Ok(self.launchers.clone())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn agent(id: i32, name: &str, guid: &str, children: &[&str]) -> Agent {
    Agent {
        id: Some(AgentId(id)),
        name: name.to_string(),
        guid: guid.to_string(),
        children: children.iter().map(|c| c.to_string()).collect(),
        hostname: "WS01".into(),
        user_domain_name: "CORP".into(),
        user_name: "alice".into(),
        ..Default::default()
    }
}

fn record(id: i32, name: &str, status: TaskStatus, completed: Option<i64>, output: &str) -> TaskRecord {
    TaskRecord {
        id: TaskingId(id),
        agent_id: AgentId(1),
        name: name.to_string(),
        tasking_type: TaskingType::Assembly,
        message: String::new(),
        command: "whoami".into(),
        status,
        token_task: false,
        completion_time: completed.and_then(|t| Utc.timestamp_opt(t, 0).single()),
        tasking_user: "operator".into(),
        output: output.to_string(),
    }
}

fn server() -> FakeServer {
    FakeServer {
        agents: Mutex::new(vec![
            agent(1, "g1", "guid-1", &["guid-2"]),
            agent(2, "g2", "guid-2", &[]),
            agent(3, "g3", "guid-3", &[]),
        ]),
        launchers: vec![
            Launcher {
                id: Some(1),
                name: "PowerShell".into(),
            },
            Launcher {
                id: Some(2),
                name: "MSBuild".into(),
            },
        ],
        ..Default::default()
    }
}

async fn open_with(server: Arc<FakeServer>, data: Arc<dyn DataDirectory>) -> InteractSession {
    InteractSession::open(Remote::new(server), data, Arc::new(Catalog::standard()), "g1")
        .await
        .unwrap()
}

async fn open(server: Arc<FakeServer>) -> InteractSession {
    open_with(server, Arc::new(LocalDataDirectory::new("/nonexistent"))).await
}

fn submitted_one(outcome: Outcome) -> (TaskingId, String) {
    match outcome {
        Outcome::Submitted(s) => (s.id, s.name),
        other => panic!("expected submission, got {:?}", other),
    }
}

// ============================================================================
// Session state
// ============================================================================

#[tokio::test]
async fn test_open_loads_children_launchers_and_history() {
    let server = Arc::new(server());
    *server.taskings.lock().unwrap() = vec![record(1, "aaaa", TaskStatus::Completed, Some(10), "x")];

    let session = open(server.clone()).await;
    assert_eq!(session.name(), "g1");
    assert_eq!(session.children().len(), 1);
    assert_eq!(session.children()[0].name, "g2");
    assert_eq!(session.launchers().len(), 2);
    assert_eq!(session.store().len(), 1);
}

#[tokio::test]
async fn test_unknown_agent_is_not_found() {
    let server = Arc::new(server());
    let result = InteractSession::open(
        Remote::new(server),
        Arc::new(LocalDataDirectory::new("/nonexistent")),
        Arc::new(Catalog::standard()),
        "nobody",
    )
    .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_show_summarizes_tasks() {
    let server = Arc::new(server());
    *server.taskings.lock().unwrap() = vec![
        record(1, "done", TaskStatus::Completed, Some(10), "x"),
        record(2, "running", TaskStatus::Progressed, None, ""),
    ];
    let mut session = open(server.clone()).await;

    match session.execute("show").await.unwrap() {
        Outcome::Show(summary) => {
            assert_eq!(summary.agent.name, "g1");
            assert_eq!(summary.children, vec!["g2"]);
            assert_eq!(summary.tasks_assigned, vec!["running", "done"]);
            assert_eq!(summary.tasks_completed, vec!["done"]);
        }
        other => panic!("unexpected {:?}", other),
    }
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_usage_errors_make_no_remote_calls() {
    let server = Arc::new(server());
    let mut session = open(server.clone()).await;
    let before = server.calls();

    for input in [
        "GetSystem now",
        "Kerberoast a b c",
        "MakeToken bob CORP",
        "WMICommand host calc bob",
        "Set Delay soon",
        "As",
        "As History",
    ] {
        let result = session.execute(input).await;
        assert!(
            matches!(result, Err(Error::Usage { .. })),
            "{} -> {:?}",
            input,
            result
        );
    }

    for input in [
        "WMIGrunt host Regsvr32",
        "Kerberoast alice rainbow",
        "PortScan host 80 maybe",
        "Set Sleep 5",
        "DCOMGrunt host PowerShell wmi",
    ] {
        let result = session.execute(input).await;
        assert!(
            matches!(result, Err(Error::Validation(_))),
            "{} -> {:?}",
            input,
            result
        );
    }
    assert!(matches!(
        session.execute("Bogus").await,
        Err(Error::NotFound(_))
    ));

    assert_eq!(server.calls(), before);
    assert!(server.submitted().is_empty());
}

// ============================================================================
// Task compilation through the session
// ============================================================================

#[tokio::test]
async fn test_get_system_submits_once_without_fields() {
    let server = Arc::new(server());
    let mut session = open(server.clone()).await;

    let (id, name) = submitted_one(session.execute("GetSystem").await.unwrap());
    assert_eq!(id, TaskingId(101));

    let submitted = server.submitted();
    assert_eq!(submitted.len(), 1);
    let task = &submitted[0];
    assert_eq!(task.kind, TaskKind::GetSystem);
    assert!(task.options.is_empty());
    assert!(task.token_task);
    assert_eq!(task.name, name);
    assert_eq!(task.agent_id, AgentId(1));
    assert_eq!(task.id, None);
}

#[tokio::test]
async fn test_kerberoast_argument_forms() {
    let server = Arc::new(server());
    let mut session = open(server.clone()).await;

    session.execute("Kerberoast alice john").await.unwrap();
    session.execute("Kerberoast john").await.unwrap();
    session.execute("Kerberoast").await.unwrap();

    let submitted = server.submitted();
    assert_eq!(
        submitted[0].options,
        vec![
            (TaskField::Usernames, "alice".to_string()),
            (TaskField::HashFormat, "john".to_string())
        ]
    );
    assert_eq!(
        submitted[1].options,
        vec![
            (TaskField::Usernames, String::new()),
            (TaskField::HashFormat, "john".to_string())
        ]
    );
    assert_eq!(submitted[2].option(TaskField::HashFormat), Some("hashcat"));
}

#[tokio::test]
async fn test_make_token_stages_fields_in_order() {
    let server = Arc::new(server());
    let mut session = open(server.clone()).await;

    session
        .execute("MakeToken bob CORP secret LOGON32_LOGON_INTERACTIVE")
        .await
        .unwrap();
    session.execute("maketoken bob CORP secret").await.unwrap();

    let submitted = server.submitted();
    assert_eq!(
        submitted[0].options,
        vec![
            (TaskField::Username, "bob".to_string()),
            (TaskField::Domain, "CORP".to_string()),
            (TaskField::Password, "secret".to_string()),
            (TaskField::LogonType, "LOGON32_LOGON_INTERACTIVE".to_string()),
        ]
    );
    assert!(submitted[0].token_task);
    // the template supplies the logon type
    assert_eq!(submitted[1].options.len(), 3);
    assert_eq!(submitted[1].option(TaskField::LogonType), None);
}

#[tokio::test]
async fn test_as_prefix_sets_token_flag() {
    let server = Arc::new(server());
    let mut session = open(server.clone()).await;

    session.execute("As Shell whoami /all").await.unwrap();
    session.execute("Shell whoami /all").await.unwrap();

    let submitted = server.submitted();
    assert!(submitted[0].token_task);
    assert_eq!(submitted[0].option(TaskField::ShellCommand), Some("whoami /all"));
    assert_eq!(submitted[0].command, "As Shell whoami /all");
    assert!(!submitted[1].token_task);
}

#[tokio::test]
async fn test_connect_message_uses_default_pipe() {
    let server = Arc::new(server());
    let mut session = open(server.clone()).await;

    session.execute("Connect dc01").await.unwrap();
    session.execute("Set Delay 30").await.unwrap();

    let submitted = server.submitted();
    assert_eq!(submitted[0].kind, TaskKind::Connect);
    assert_eq!(submitted[0].message, "dc01,gruntsvc");
    assert_eq!(submitted[0].option(TaskField::PipeName), None);
    assert_eq!(submitted[1].kind, TaskKind::SetDelay);
    assert_eq!(submitted[1].message, "30");
}

#[tokio::test]
async fn test_failed_submission_changes_nothing() {
    let server = Arc::new(FakeServer {
        fail_submit: true,
        ..server()
    });
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tools.ps1"), "function Get-Tool {}").unwrap();
    let mut session = open_with(server.clone(), Arc::new(LocalDataDirectory::new(dir.path()))).await;
    let store = session.store().clone();

    let result = session.execute("PowerShellImport tools.ps1").await;
    assert!(matches!(result, Err(Error::Remote(_))));
    assert_eq!(session.powershell_import(), "");
    assert_eq!(session.store(), &store);
}

// ============================================================================
// Data directory
// ============================================================================

#[tokio::test]
async fn test_powershell_import_is_prepended() {
    let server = Arc::new(server());
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tools.ps1"), "function Get-Tool {}\n").unwrap();
    let mut session = open_with(server.clone(), Arc::new(LocalDataDirectory::new(dir.path()))).await;

    session.execute("PowerShellImport tools.ps1").await.unwrap();
    session.execute("PowerShell Get-Tool -All").await.unwrap();

    let submitted = server.submitted();
    assert_eq!(submitted[0].kind, TaskKind::PowerShell);
    assert_eq!(
        submitted[0].option(TaskField::PowerShellCommand),
        Some("function Get-Tool {}\n")
    );
    assert_eq!(
        submitted[1].option(TaskField::PowerShellCommand),
        Some("function Get-Tool {}\r\nGet-Tool -All")
    );
}

#[tokio::test]
async fn test_upload_sends_file_contents_base64() {
    let server = Arc::new(server());
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("note.txt"), b"hello").unwrap();
    let mut session = open_with(server.clone(), Arc::new(LocalDataDirectory::new(dir.path()))).await;

    session.execute("Upload note.txt").await.unwrap();
    assert!(matches!(
        session.execute(r"Upload ..\..\etc\passwd").await,
        Err(Error::NotFound(_)) | Err(Error::Validation(_))
    ));
    assert!(matches!(
        session.execute("Upload ../secret").await,
        Err(Error::Validation(_))
    ));

    let submitted = server.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].option(TaskField::LocalFilePath), Some("aGVsbG8="));
}

// ============================================================================
// Disconnect
// ============================================================================

#[tokio::test]
async fn test_disconnect_requires_child() {
    let server = Arc::new(server());
    let mut session = open(server.clone()).await;

    match session.execute("Disconnect g3").await {
        Err(Error::Validation(msg)) => assert_eq!(msg, "Grunt: \"g3\" is not a child Grunt"),
        other => panic!("unexpected {:?}", other),
    }
    match session.execute("Disconnect ghost").await {
        Err(Error::NotFound(msg)) => assert_eq!(msg, "Invalid GruntName selected: ghost"),
        other => panic!("unexpected {:?}", other),
    }

    session.execute("Disconnect g2").await.unwrap();
    let submitted = server.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].kind, TaskKind::Disconnect);
    assert_eq!(submitted[0].message, "guid-2");
}

// ============================================================================
// History
// ============================================================================

fn history(outcome: Outcome) -> Vec<TaskRecord> {
    match outcome {
        Outcome::History(records) => records,
        other => panic!("expected history, got {:?}", other),
    }
}

#[tokio::test]
async fn test_history_refresh_is_idempotent() {
    let server = Arc::new(server());
    *server.taskings.lock().unwrap() = vec![
        record(1, "aaaa", TaskStatus::Completed, Some(10), "one"),
        record(2, "bbbb", TaskStatus::Queued, None, ""),
    ];
    let mut session = open(server.clone()).await;

    let first = history(session.execute("History").await.unwrap());
    let snapshot = session.store().clone();
    let second = history(session.execute("History").await.unwrap());

    assert_eq!(first, second);
    assert_eq!(session.store(), &snapshot);
    assert_eq!(second.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["bbbb", "aaaa"]);
}

#[tokio::test]
async fn test_completed_output_is_not_clobbered() {
    let server = Arc::new(server());
    *server.taskings.lock().unwrap() = vec![record(1, "aaaa", TaskStatus::Completed, Some(10), "secret output")];
    let mut session = open(server.clone()).await;

    *server.taskings.lock().unwrap() = vec![record(1, "aaaa", TaskStatus::Completed, Some(10), "")];
    let records = history(session.execute("History").await.unwrap());

    assert_eq!(records[0].output, "secret output");
}

#[tokio::test]
async fn test_history_by_name_fetches_detail() {
    let server = Arc::new(server());
    *server.taskings.lock().unwrap() = vec![
        record(1, "aaaa", TaskStatus::Completed, Some(10), ""),
        record(2, "bbbb", TaskStatus::Completed, Some(20), "two"),
    ];
    *server.details.lock().unwrap() = vec![record(1, "aaaa", TaskStatus::Completed, Some(10), "full")];
    let mut session = open(server.clone()).await;

    let records = history(session.execute("History AAAA").await.unwrap());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].output, "full");
    assert_eq!(session.store().position(TaskingId(1)), Some(0));
}

#[tokio::test]
async fn test_history_last_k_is_rederived_after_refresh() {
    let server = Arc::new(server());
    *server.taskings.lock().unwrap() = vec![
        record(1, "aaaa", TaskStatus::Completed, Some(10), "one"),
        record(2, "bbbb", TaskStatus::Completed, Some(20), "two"),
        record(3, "cccc", TaskStatus::Progressed, None, ""),
    ];
    let mut session = open(server.clone()).await;

    // cccc completes after the sample (aaaa, bbbb) was taken
    *server.taskings.lock().unwrap() = vec![
        record(1, "aaaa", TaskStatus::Completed, Some(10), "one"),
        record(2, "bbbb", TaskStatus::Completed, Some(20), "two"),
        record(3, "cccc", TaskStatus::Completed, Some(30), "three"),
    ];
    let records = history(session.execute("History 2").await.unwrap());

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["bbbb", "cccc"]);
}

#[tokio::test]
async fn test_history_invalid_argument_lists_names() {
    let server = Arc::new(server());
    *server.taskings.lock().unwrap() = vec![record(1, "aaaa", TaskStatus::Completed, Some(10), "x")];
    let mut session = open(server.clone()).await;

    match session.execute("History zzzz").await {
        Err(Error::Validation(msg)) => {
            assert!(msg.contains("History [ <task_name> | <task_quantity> ]"));
            assert!(msg.ends_with("Valid completed TaskNames: aaaa"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_history_unknown_name_leaves_store_untouched() {
    let server = Arc::new(server());
    *server.taskings.lock().unwrap() = vec![record(1, "aaaa", TaskStatus::Queued, None, "")];
    let mut session = open(server.clone()).await;
    let snapshot = session.store().clone();

    *server.taskings.lock().unwrap() = vec![
        record(1, "aaaa", TaskStatus::Completed, Some(10), "done"),
        record(2, "bbbb", TaskStatus::Queued, None, ""),
    ];
    assert!(matches!(
        session.execute("History zzzz").await,
        Err(Error::Validation(_))
    ));
    assert_eq!(session.store(), &snapshot);
}

#[tokio::test]
async fn test_history_finds_task_queued_since_last_refresh() {
    let server = Arc::new(server());
    let mut session = open(server.clone()).await;
    assert!(session.store().is_empty());

    *server.taskings.lock().unwrap() = vec![record(2, "bbbb", TaskStatus::Completed, Some(20), "two")];
    let records = history(session.execute("History bbbb").await.unwrap());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].output, "two");
    assert_eq!(session.store().len(), 1);
}

// ============================================================================
// Console
// ============================================================================

fn console(server: Arc<FakeServer>) -> Console {
    Console::new(
        Remote::new(server),
        Arc::new(LocalDataDirectory::new("/nonexistent")),
    )
}

#[tokio::test]
async fn test_kill_requires_confirmation() {
    let server = Arc::new(server());
    let mut console = console(server.clone());
    assert!(matches!(
        console.handle("Interact g1").await.unwrap(),
        Reply::Entered(name) if name == "g1"
    ));
    assert_eq!(console.prompt(), "(g1) > ");

    match console.handle("Kill").await.unwrap() {
        Reply::Confirm(question) => assert_eq!(question, "Kill Grunt: g1? [y/N] "),
        other => panic!("unexpected {:?}", other),
    }
    assert!(console.is_confirming());
    assert!(matches!(
        console.handle("").await.unwrap(),
        Reply::Outcome(Outcome::Aborted)
    ));
    assert!(server.submitted().is_empty());

    console.handle("kill").await.unwrap();
    assert!(matches!(
        console.handle("Yes").await.unwrap(),
        Reply::Outcome(Outcome::Submitted(_))
    ));
    assert_eq!(server.submitted()[0].kind, TaskKind::Kill);
}

#[tokio::test]
async fn test_console_navigation() {
    let server = Arc::new(server());
    let mut console = console(server.clone());
    assert_eq!(console.prompt(), "Elite > ");

    match console.handle("Interact nobody").await {
        Err(Error::Usage { usage, .. }) => assert_eq!(usage, "Interact <grunt_name>"),
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(console.handle("whoami").await, Err(Error::NotFound(_))));
    assert!(matches!(
        console.handle("Grunts").await.unwrap(),
        Reply::Agents(agents) if agents.len() == 3
    ));

    console.handle("interact g1").await.unwrap();
    assert!(console.help().iter().any(|h| h.name == "Kerberoast"));
    assert!(matches!(console.handle("back").await.unwrap(), Reply::Left));
    assert!(console.session().is_none());
    assert!(!console.help().iter().any(|h| h.name == "Kerberoast"));
    assert!(matches!(console.handle("EXIT").await.unwrap(), Reply::Exit));
}

#[tokio::test]
async fn test_help_lists_dynamic_hints() {
    let server = Arc::new(server());
    let mut console = console(server);
    console.handle("Interact g1").await.unwrap();

    let help = console.help();
    let bypass = help.iter().find(|h| h.name == "BypassUACGrunt").unwrap();
    assert_eq!(bypass.usage, "bypassuacgrunt <launcher>");
    assert_eq!(bypass.parameters, vec!["<Launcher> (PowerShell | MSBuild)"]);
}

#[tokio::test]
async fn test_completions() {
    let server = Arc::new(server());
    let session = open(server).await;

    assert_eq!(session.completions("Kerb"), vec!["Kerberoast"]);
    assert_eq!(session.completions("BypassUACGrunt ms"), vec!["MSBuild"]);
    assert_eq!(session.completions("Disconnect "), vec!["g2"]);
    assert_eq!(
        session.completions("GetRegistryKey HKEY_LOCAL"),
        vec!["HKEY_LOCAL_MACHINE\\"]
    );
    assert!(session.completions("Nope x").is_empty());
}
