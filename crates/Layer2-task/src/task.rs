//! Tasking definitions and types

use crate::state::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Team-server id of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub i32);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote-assigned id of a tasking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskingId(pub i32);

impl std::fmt::Display for TaskingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Random 10 character lowercase hex token used as a tasking name
pub fn new_task_name() -> String {
    let mut name = Uuid::new_v4().simple().to_string();
    name.truncate(10);
    name
}

// ============================================================================
// Agent / Launcher
// ============================================================================

/// A remotely executing agent, as reported by the agent directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: Option<AgentId>,
    pub name: String,
    pub guid: String,
    /// Guids of agents connected through this one
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub comm_type: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub user_domain_name: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub integrity: String,
    #[serde(default)]
    pub operating_system: String,
    #[serde(default)]
    pub process: String,
    #[serde(default)]
    pub delay: i32,
    #[serde(default)]
    pub jitter_percent: i32,
    #[serde(default)]
    pub connect_attempts: i32,
    pub last_check_in: Option<DateTime<Utc>>,
    pub activation_time: Option<DateTime<Utc>>,
    pub kill_date: Option<DateTime<Utc>>,
}

impl Agent {
    /// `DOMAIN\user`
    pub fn qualified_user(&self) -> String {
        format!("{}\\{}", self.user_domain_name, self.user_name)
    }

    pub fn has_child(&self, guid: &str) -> bool {
        self.children.iter().any(|c| c.eq_ignore_ascii_case(guid))
    }
}

/// A launcher that can stage a new agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Launcher {
    pub id: Option<i32>,
    pub name: String,
}

// ============================================================================
// Tasking type (wire category)
// ============================================================================

/// Category the task queue dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskingType {
    #[default]
    Assembly,
    SetDelay,
    SetJitter,
    SetConnectAttempts,
    Kill,
    Connect,
    Disconnect,
    Jobs,
}

impl TaskingType {
    const ALL: [TaskingType; 8] = [
        TaskingType::Assembly,
        TaskingType::SetDelay,
        TaskingType::SetJitter,
        TaskingType::SetConnectAttempts,
        TaskingType::Kill,
        TaskingType::Connect,
        TaskingType::Disconnect,
        TaskingType::Jobs,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            TaskingType::Assembly => "Assembly",
            TaskingType::SetDelay => "SetDelay",
            TaskingType::SetJitter => "SetJitter",
            TaskingType::SetConnectAttempts => "SetConnectAttempts",
            TaskingType::Kill => "Kill",
            TaskingType::Connect => "Connect",
            TaskingType::Disconnect => "Disconnect",
            TaskingType::Jobs => "Jobs",
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.display_name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for TaskingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Task kind (task-type tag)
// ============================================================================

/// What a descriptor asks the agent to do. Module kinds map to a remote task
/// template of the same name; control kinds are dispatched directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    WhoAmI,
    ListDirectory,
    ChangeDirectory,
    ProcessList,
    GetRegistryKey,
    SetRegistryKey,
    GetRemoteRegistryKey,
    SetRemoteRegistryKey,
    Upload,
    Download,
    Assembly,
    AssemblyReflect,
    SharpShell,
    Shell,
    ShellCmd,
    PowerShell,
    PortScan,
    Mimikatz,
    Rubeus,
    SharpDPAPI,
    SharpUp,
    SafetyKatz,
    SharpDump,
    SharpWMI,
    Seatbelt,
    Kerberoast,
    GetDomainUser,
    GetDomainGroup,
    GetDomainComputer,
    GetNetLocalGroup,
    GetNetLocalGroupMember,
    GetNetLoggedOnUser,
    GetNetSession,
    ImpersonateUser,
    ImpersonateProcess,
    GetSystem,
    MakeToken,
    RevertToSelf,
    WMICommand,
    WMIGrunt,
    DCOMCommand,
    DCOMGrunt,
    BypassUACCommand,
    BypassUACGrunt,

    // control
    SetDelay,
    SetJitter,
    SetConnectAttempts,
    Kill,
    Connect,
    Disconnect,
    Jobs,
}

impl TaskKind {
    /// Remote template name (module kinds) or tasking name (control kinds)
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::WhoAmI => "WhoAmI",
            TaskKind::ListDirectory => "ListDirectory",
            TaskKind::ChangeDirectory => "ChangeDirectory",
            TaskKind::ProcessList => "ProcessList",
            TaskKind::GetRegistryKey => "GetRegistryKey",
            TaskKind::SetRegistryKey => "SetRegistryKey",
            TaskKind::GetRemoteRegistryKey => "GetRemoteRegistryKey",
            TaskKind::SetRemoteRegistryKey => "SetRemoteRegistryKey",
            TaskKind::Upload => "Upload",
            TaskKind::Download => "Download",
            TaskKind::Assembly => "Assembly",
            TaskKind::AssemblyReflect => "AssemblyReflect",
            TaskKind::SharpShell => "SharpShell",
            TaskKind::Shell => "Shell",
            TaskKind::ShellCmd => "ShellCmd",
            TaskKind::PowerShell => "PowerShell",
            TaskKind::PortScan => "PortScan",
            TaskKind::Mimikatz => "Mimikatz",
            TaskKind::Rubeus => "Rubeus",
            TaskKind::SharpDPAPI => "SharpDPAPI",
            TaskKind::SharpUp => "SharpUp",
            TaskKind::SafetyKatz => "SafetyKatz",
            TaskKind::SharpDump => "SharpDump",
            TaskKind::SharpWMI => "SharpWMI",
            TaskKind::Seatbelt => "Seatbelt",
            TaskKind::Kerberoast => "Kerberoast",
            TaskKind::GetDomainUser => "GetDomainUser",
            TaskKind::GetDomainGroup => "GetDomainGroup",
            TaskKind::GetDomainComputer => "GetDomainComputer",
            TaskKind::GetNetLocalGroup => "GetNetLocalGroup",
            TaskKind::GetNetLocalGroupMember => "GetNetLocalGroupMember",
            TaskKind::GetNetLoggedOnUser => "GetNetLoggedOnUser",
            TaskKind::GetNetSession => "GetNetSession",
            TaskKind::ImpersonateUser => "ImpersonateUser",
            TaskKind::ImpersonateProcess => "ImpersonateProcess",
            TaskKind::GetSystem => "GetSystem",
            TaskKind::MakeToken => "MakeToken",
            TaskKind::RevertToSelf => "RevertToSelf",
            TaskKind::WMICommand => "WMICommand",
            TaskKind::WMIGrunt => "WMIGrunt",
            TaskKind::DCOMCommand => "DCOMCommand",
            TaskKind::DCOMGrunt => "DCOMGrunt",
            TaskKind::BypassUACCommand => "BypassUACCommand",
            TaskKind::BypassUACGrunt => "BypassUACGrunt",
            TaskKind::SetDelay => "SetDelay",
            TaskKind::SetJitter => "SetJitter",
            TaskKind::SetConnectAttempts => "SetConnectAttempts",
            TaskKind::Kill => "Kill",
            TaskKind::Connect => "Connect",
            TaskKind::Disconnect => "Disconnect",
            TaskKind::Jobs => "Jobs",
        }
    }

    pub fn tasking_type(&self) -> TaskingType {
        match self {
            TaskKind::SetDelay => TaskingType::SetDelay,
            TaskKind::SetJitter => TaskingType::SetJitter,
            TaskKind::SetConnectAttempts => TaskingType::SetConnectAttempts,
            TaskKind::Kill => TaskingType::Kill,
            TaskKind::Connect => TaskingType::Connect,
            TaskKind::Disconnect => TaskingType::Disconnect,
            TaskKind::Jobs => TaskingType::Jobs,
            _ => TaskingType::Assembly,
        }
    }

    /// Control kinds carry their payload in the tasking message instead of a
    /// remote template.
    pub fn is_control(&self) -> bool {
        self.tasking_type() != TaskingType::Assembly
    }

    /// Kinds that run under (or change) an impersonated token
    pub fn is_token(&self) -> bool {
        matches!(
            self,
            TaskKind::ImpersonateUser
                | TaskKind::ImpersonateProcess
                | TaskKind::GetSystem
                | TaskKind::MakeToken
                | TaskKind::RevertToSelf
        )
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Task field (stageable option)
// ============================================================================

/// Every field a command can stage on the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskField {
    Path,
    Directory,
    RegPath,
    Value,
    Hostname,
    LocalFilePath,
    FileName,
    Parameters,
    TypeName,
    MethodName,
    ShellCommand,
    PowerShellCommand,
    Code,
    ComputerNames,
    Ports,
    Ping,
    Command,
    Usernames,
    HashFormat,
    Identities,
    LocalGroup,
    Username,
    ProcessId,
    Domain,
    Password,
    LogonType,
    ComputerName,
    Launcher,
    Method,
    Delay,
    JitterPercent,
    ConnectAttempts,
    PipeName,
    ChildGuid,
}

impl TaskField {
    /// Option name on the remote task template
    pub fn option_name(&self) -> &'static str {
        match self {
            TaskField::Path => "Path",
            TaskField::Directory => "Directory",
            TaskField::RegPath => "RegPath",
            TaskField::Value => "Value",
            TaskField::Hostname => "Hostname",
            TaskField::LocalFilePath => "LocalFilePath",
            TaskField::FileName => "FileName",
            TaskField::Parameters => "Parameters",
            TaskField::TypeName => "TypeName",
            TaskField::MethodName => "MethodName",
            TaskField::ShellCommand => "ShellCommand",
            TaskField::PowerShellCommand => "PowerShellCommand",
            TaskField::Code => "Code",
            TaskField::ComputerNames => "ComputerNames",
            TaskField::Ports => "Ports",
            TaskField::Ping => "Ping",
            TaskField::Command => "Command",
            TaskField::Usernames => "Usernames",
            TaskField::HashFormat => "HashFormat",
            TaskField::Identities => "Identities",
            TaskField::LocalGroup => "LocalGroup",
            TaskField::Username => "Username",
            TaskField::ProcessId => "ProcessID",
            TaskField::Domain => "Domain",
            TaskField::Password => "Password",
            TaskField::LogonType => "LogonType",
            TaskField::ComputerName => "ComputerName",
            TaskField::Launcher => "Launcher",
            TaskField::Method => "Method",
            TaskField::Delay => "Delay",
            TaskField::JitterPercent => "JitterPercent",
            TaskField::ConnectAttempts => "ConnectAttempts",
            TaskField::PipeName => "PipeName",
            TaskField::ChildGuid => "ChildGuid",
        }
    }
}

impl std::fmt::Display for TaskField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.option_name())
    }
}

// ============================================================================
// Task descriptor
// ============================================================================

/// A finalized task-submission request. Immutable once built by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Remote-assigned id; never set locally
    pub id: Option<TaskingId>,

    /// Target agent
    pub agent_id: AgentId,

    /// Random local name (10 lowercase hex chars)
    pub name: String,

    pub kind: TaskKind,

    /// Payload for control kinds (empty for module kinds)
    pub message: String,

    /// Raw operator input that produced this descriptor
    pub command: String,

    pub status: TaskStatus,

    /// Execute under an impersonated identity
    pub token_task: bool,

    /// Staged option values in staging order
    pub options: Vec<(TaskField, String)>,

    /// Options explicitly cleared so the remote default applies
    pub cleared: Vec<TaskField>,
}

impl TaskDescriptor {
    pub fn option(&self, field: TaskField) -> Option<&str> {
        self.options
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn tasking_type(&self) -> TaskingType {
        self.kind.tasking_type()
    }
}

// ============================================================================
// Task record
// ============================================================================

/// A tasking as reported back by the tasking detail service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: TaskingId,
    pub agent_id: AgentId,
    pub name: String,
    pub tasking_type: TaskingType,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub command: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub token_task: bool,
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tasking_user: String,
    #[serde(default)]
    pub output: String,
}

impl TaskRecord {
    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    /// Completed with output: nothing a later copy could add.
    pub fn is_final(&self) -> bool {
        self.status.is_terminal() && self.has_output()
    }
}
