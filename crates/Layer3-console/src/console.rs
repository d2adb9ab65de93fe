//! Console - 최상위 메뉴와 interact 세션 전환
//!
//! `Grunts`, `Interact <name>`, `Back`, `Help`, `Exit` 를 처리하고
//! 나머지 입력은 현재 세션으로 전달한다. `Kill` 같은 확인이 필요한 명령은
//! 다음 입력 줄을 답으로 사용한다.

use crate::commands::Catalog;
use crate::parser::{command_word, tokenize, TokenMode};
use crate::session::{InteractSession, Outcome, PendingTask, Remote, AS_USAGE};
use elite_foundation::{Error, Result};
use elite_task::{Agent, DataDirectory};
use std::sync::Arc;
use tracing::debug;

pub const INTERACT_USAGE: &str = "Interact <grunt_name>";

/// One line of `Help` output
#[derive(Debug, Clone, PartialEq)]
pub struct HelpEntry {
    pub name: String,
    pub usage: String,
    pub description: String,
    /// `<Name>` / `[Name]` with value hints, if any
    pub parameters: Vec<String>,
}

/// What the console did with a line
#[derive(Debug, Clone)]
pub enum Reply {
    Outcome(Outcome),
    Agents(Vec<Agent>),
    Entered(String),
    Left,
    Help(Vec<HelpEntry>),
    /// Print the question; the next line is the answer
    Confirm(String),
    Exit,
}

pub struct Console {
    remote: Remote,
    data: Arc<dyn DataDirectory>,
    catalog: Arc<Catalog>,
    session: Option<InteractSession>,
    pending: Option<PendingTask>,
}

impl Console {
    pub fn new(remote: Remote, data: Arc<dyn DataDirectory>) -> Self {
        Self::with_catalog(remote, data, Catalog::standard())
    }

    pub fn with_catalog(remote: Remote, data: Arc<dyn DataDirectory>, catalog: Catalog) -> Self {
        Self {
            remote,
            data,
            catalog: Arc::new(catalog),
            session: None,
            pending: None,
        }
    }

    pub fn session(&self) -> Option<&InteractSession> {
        self.session.as_ref()
    }

    pub fn is_confirming(&self) -> bool {
        self.pending.is_some()
    }

    pub fn prompt(&self) -> String {
        match (&self.pending, &self.session) {
            (Some(_), _) => String::new(),
            (None, Some(session)) => format!("({}) > ", session.name()),
            (None, None) => "Elite > ".to_string(),
        }
    }

    /// Handle one input line. Errors never end the console.
    pub async fn handle(&mut self, line: &str) -> Result<Reply> {
        if let Some(pending) = self.pending.take() {
            let session = self
                .session
                .as_mut()
                .ok_or_else(|| Error::Internal("confirmation without a session".to_string()))?;
            return session.resolve(pending, line).await.map(Reply::Outcome);
        }

        let input = line.trim();
        let word = command_word(input);
        match word.to_ascii_lowercase().as_str() {
            "" => Ok(Reply::Outcome(Outcome::Nothing)),
            "exit" => Ok(Reply::Exit),
            "help" => Ok(Reply::Help(self.help())),
            "grunts" => Ok(Reply::Agents(self.remote.agents.agents().await?)),
            "interact" => self.interact(input).await,
            "back" if self.session.is_some() => {
                self.session = None;
                Ok(Reply::Left)
            }
            _ => {
                let Some(session) = self.session.as_mut() else {
                    return Err(Error::NotFound(format!("command \"{}\"", word)));
                };
                match session.execute(input).await? {
                    Outcome::Confirm(pending) => {
                        let question = pending.question().to_string();
                        self.pending = Some(pending);
                        Ok(Reply::Confirm(question))
                    }
                    outcome => Ok(Reply::Outcome(outcome)),
                }
            }
        }
    }

    async fn interact(&mut self, input: &str) -> Result<Reply> {
        let tokens = tokenize(input, TokenMode::Quoted);
        if tokens.len() != 2 {
            return Err(Error::usage(INTERACT_USAGE, input));
        }

        let opened = InteractSession::open(
            self.remote.clone(),
            Arc::clone(&self.data),
            Arc::clone(&self.catalog),
            &tokens[1],
        )
        .await;
        match opened {
            Ok(session) => {
                let name = session.name().to_string();
                debug!(grunt = %name, "Entered interact session");
                self.session = Some(session);
                Ok(Reply::Entered(name))
            }
            Err(Error::NotFound(_)) => Err(Error::usage(INTERACT_USAGE, input)),
            Err(e) => Err(e),
        }
    }

    /// Console commands, plus the catalogue inside a session
    pub fn help(&self) -> Vec<HelpEntry> {
        let mut entries = vec![
            entry("Grunts", "Grunts", "List Grunts"),
            entry("Interact", INTERACT_USAGE, "Interact with a Grunt"),
            entry("Back", "Back", "Leave the current Grunt"),
            entry("Help", "Help", "Show this help"),
            entry("Exit", "Exit", "Exit the console"),
        ];

        let Some(session) = &self.session else {
            return entries;
        };

        entries.push(entry(
            "As",
            AS_USAGE,
            "Run a task command under the impersonated token",
        ));
        for spec in self.catalog.iter() {
            let parameters = spec
                .parameters
                .iter()
                .map(|p| {
                    let hints = p.candidates(session);
                    if hints.is_empty() {
                        p.to_string()
                    } else {
                        format!("{} ({})", p, hints.join(" | "))
                    }
                })
                .collect();
            entries.push(HelpEntry {
                name: spec.name.to_string(),
                usage: spec.usage.to_string(),
                description: spec.description.to_string(),
                parameters,
            });
        }
        entries
    }
}

fn entry(name: &str, usage: &str, description: &str) -> HelpEntry {
    HelpEntry {
        name: name.to_string(),
        usage: usage.to_string(),
        description: description.to_string(),
        parameters: Vec::new(),
    }
}
