//! Console output
//!
//! 결과 포맷팅은 순수 함수(`*_lines`)로, 색상 출력은 `Printer`가 담당한다.

use chrono::{DateTime, Utc};
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use elite_console::{AgentSummary, HelpEntry, Outcome, Reply, Submission};
use elite_foundation::Error;
use elite_task::{Agent, TaskRecord};
use std::io;

const TIME_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

// ============================================================================
// Formatting
// ============================================================================

fn time(value: &Option<DateTime<Utc>>) -> String {
    value
        .as_ref()
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_default()
}

fn row(label: &str, value: impl std::fmt::Display) -> String {
    format!("{:<18}{}", format!("{}:", label), value)
}

/// `Show` table
pub fn show_lines(summary: &AgentSummary) -> Vec<String> {
    let agent = &summary.agent;
    vec![
        row("Name", &agent.name),
        row("CommType", &agent.comm_type),
        row("Connected Grunts", summary.children.join(", ")),
        row("Hostname", &agent.hostname),
        row("IPAdress", &agent.ip_address),
        row("User", agent.qualified_user()),
        row("Status", &agent.status),
        row("LastCheckIn", time(&agent.last_check_in)),
        row("ActivationTime", time(&agent.activation_time)),
        row("Integrity", &agent.integrity),
        row("OperatingSystem", &agent.operating_system),
        row("Process", &agent.process),
        row("Delay", agent.delay),
        row("JitterPercent", agent.jitter_percent),
        row("ConnectAttempts", agent.connect_attempts),
        row("KillDate", time(&agent.kill_date)),
        row("Tasks Assigned", summary.tasks_assigned.join(", ")),
        row("Tasks Completed", summary.tasks_completed.join(", ")),
    ]
}

/// One tasking as printed by `History`
pub fn history_lines(record: &TaskRecord, agent: &str) -> Vec<String> {
    let completed = match &record.completion_time {
        Some(_) => format!("{} UTC", time(&record.completion_time)),
        None => record.status.display_name().to_string(),
    };
    let mut lines = vec![
        format!("[{}] Grunt: {} GruntTasking: {}", completed, agent, record.name),
        format!("({}) > {}", record.tasking_user, record.command),
    ];
    if record.has_output() {
        lines.extend(record.output.lines().map(str::to_string));
    }
    lines
}

/// `Grunts` table
pub fn agent_lines(agents: &[Agent]) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<12}{:<10}{:<18}{:<24}{:<10}{:<22}{}",
        "Name", "CommType", "Hostname", "User", "Status", "LastCheckIn", "Integrity"
    )];
    lines.push("-".repeat(104));
    for agent in agents {
        lines.push(format!(
            "{:<12}{:<10}{:<18}{:<24}{:<10}{:<22}{}",
            agent.name,
            agent.comm_type,
            agent.hostname,
            agent.qualified_user(),
            agent.status,
            time(&agent.last_check_in),
            agent.integrity
        ));
    }
    lines
}

pub fn help_lines(entries: &[HelpEntry]) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in entries {
        lines.push(format!("{:<24}{}", entry.name, entry.description));
        lines.push(format!("    {}", entry.usage));
        for parameter in &entry.parameters {
            lines.push(format!("      {}", parameter));
        }
    }
    lines
}

pub fn submission_line(submission: &Submission) -> String {
    let token = if submission.token_task { " as token task" } else { "" };
    format!(
        "Tasking {} queued: {} (id {}){}",
        submission.name, submission.kind, submission.id, token
    )
}

pub fn invalid_option(input: &str) -> String {
    format!("Invalid option \"{}\"", input)
}

// ============================================================================
// Printer
// ============================================================================

/// Writes replies to stdout, coloured unless disabled
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    color: bool,
}

impl Printer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn styled(&self, color: Color, text: &str, newline: bool) {
        let mut stdout = io::stdout();
        let end = if newline { "\n" } else { "" };
        // a closed stdout leaves nothing to report to
        let _ = if self.color {
            execute!(
                stdout,
                SetForegroundColor(color),
                Print(text),
                ResetColor,
                Print(end)
            )
        } else {
            execute!(stdout, Print(text), Print(end))
        };
    }

    pub fn line(&self, text: &str) {
        println!("{}", text);
    }

    pub fn info(&self, text: &str) {
        self.styled(Color::Green, text, true);
    }

    pub fn warning(&self, text: &str) {
        self.styled(Color::Yellow, text, true);
    }

    pub fn error(&self, text: &str) {
        self.styled(Color::Red, text, true);
    }

    pub fn prompt(&self, text: &str) {
        self.styled(Color::Cyan, text, false);
    }

    fn lines(&self, lines: Vec<String>) {
        for line in lines {
            self.line(&line);
        }
    }

    /// Print what the console did. `agent` names the current session.
    pub fn reply(&self, reply: &Reply, agent: Option<&str>) {
        match reply {
            Reply::Outcome(outcome) => self.outcome(outcome, agent.unwrap_or_default()),
            Reply::Agents(agents) => self.lines(agent_lines(agents)),
            Reply::Entered(name) => self.info(&format!("Interacting with Grunt: {}", name)),
            Reply::Left | Reply::Exit => {}
            Reply::Help(entries) => self.lines(help_lines(entries)),
            Reply::Confirm(question) => self.styled(Color::Yellow, question, false),
        }
    }

    fn outcome(&self, outcome: &Outcome, agent: &str) {
        match outcome {
            Outcome::Nothing => {}
            Outcome::Submitted(submission) => self.info(&submission_line(submission)),
            Outcome::Show(summary) => self.lines(show_lines(summary)),
            Outcome::History(records) => {
                for record in records {
                    self.lines(history_lines(record, agent));
                }
            }
            Outcome::Confirm(pending) => self.styled(Color::Yellow, pending.question(), false),
            Outcome::Aborted => self.warning("Tasking aborted"),
        }
    }

    /// Report a failed command. The console keeps running.
    pub fn failure(&self, err: &Error, input: &str) {
        match err {
            Error::Usage { usage, .. } => {
                self.error(&format!("Usage: {}", usage));
                self.error(&invalid_option(input));
            }
            Error::Validation(msg) | Error::NotFound(msg) => {
                self.error(msg);
                self.error(&invalid_option(input));
            }
            Error::Remote(msg) => self.error(&format!("CovenantException: {}", msg)),
            other => self.error(&other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use elite_task::{AgentId, TaskKind, TaskStatus, TaskingId, TaskingType};

    fn record(completed: bool) -> TaskRecord {
        TaskRecord {
            id: TaskingId(7),
            agent_id: AgentId(1),
            name: "3f2a9c1b7e".into(),
            tasking_type: TaskingType::Assembly,
            message: String::new(),
            command: "ls C:\\".into(),
            status: if completed {
                TaskStatus::Completed
            } else {
                TaskStatus::Queued
            },
            token_task: false,
            completion_time: completed
                .then(|| Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).single())
                .flatten(),
            tasking_user: "operator".into(),
            output: if completed { "a\nb".into() } else { String::new() },
        }
    }

    #[test]
    fn test_history_lines() {
        let lines = history_lines(&record(true), "g1");
        assert_eq!(
            lines,
            vec![
                "[03/01/2024 12:30:05 UTC] Grunt: g1 GruntTasking: 3f2a9c1b7e",
                "(operator) > ls C:\\",
                "a",
                "b",
            ]
        );

        let lines = history_lines(&record(false), "g1");
        assert_eq!(lines[0], "[Tasked] Grunt: g1 GruntTasking: 3f2a9c1b7e");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_show_lines() {
        let summary = AgentSummary {
            agent: Agent {
                name: "g1".into(),
                user_domain_name: "CORP".into(),
                user_name: "alice".into(),
                delay: 5,
                ..Default::default()
            },
            children: vec!["g2".into(), "g3".into()],
            tasks_assigned: vec!["a".into()],
            tasks_completed: vec![],
        };
        let lines = show_lines(&summary);
        assert_eq!(lines.len(), 18);
        assert_eq!(lines[0], "Name:             g1");
        assert_eq!(lines[2], "Connected Grunts: g2, g3");
        assert_eq!(lines[5], "User:             CORP\\alice");
        assert_eq!(lines[12], "Delay:            5");
    }

    #[test]
    fn test_submission_line() {
        let line = submission_line(&Submission {
            id: TaskingId(12),
            name: "abc".into(),
            kind: TaskKind::Shell,
            token_task: true,
        });
        assert_eq!(line, "Tasking abc queued: Shell (id 12) as token task");
    }

    #[test]
    fn test_help_lines() {
        let lines = help_lines(&[HelpEntry {
            name: "Upload".into(),
            usage: "Upload <local_file_path>".into(),
            description: "Upload a file".into(),
            parameters: vec!["<LocalFilePath> (a.exe)".into()],
        }]);
        assert_eq!(lines[1], "    Upload <local_file_path>");
        assert_eq!(lines[2], "      <LocalFilePath> (a.exe)");
    }
}
