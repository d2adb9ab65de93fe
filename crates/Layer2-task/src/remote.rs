//! Collaborator traits
//!
//! 콘솔 코어가 의존하는 외부 서비스 경계. HTTP 구현은 `elite-provider`,
//! 테스트에서는 fake 구현을 주입한다.

use crate::task::{Agent, AgentId, Launcher, TaskDescriptor, TaskRecord, TaskingId};
use async_trait::async_trait;
use elite_foundation::{Error, Result};
use std::path::{Component, Path, PathBuf};

// ============================================================================
// Remote services
// ============================================================================

/// Agent lookup. Missing agents are reported as `Error::NotFound`.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn agents(&self) -> Result<Vec<Agent>>;

    async fn agent_by_id(&self, id: AgentId) -> Result<Agent>;

    async fn agent_by_name(&self, name: &str) -> Result<Agent>;

    async fn agent_by_guid(&self, guid: &str) -> Result<Agent>;
}

/// Task queue - accepts a finalized descriptor and assigns a tasking id.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn submit(&self, task: &TaskDescriptor) -> Result<TaskingId>;
}

/// Tasking detail service - polled for execution results.
#[async_trait]
pub trait TaskingDetail: Send + Sync {
    /// All taskings of an agent
    async fn list(&self, agent: AgentId) -> Result<Vec<TaskRecord>>;

    /// A single tasking including its full output
    async fn detail(&self, agent: AgentId, id: TaskingId) -> Result<TaskRecord>;
}

#[async_trait]
pub trait LauncherCatalog: Send + Sync {
    async fn launchers(&self) -> Result<Vec<Launcher>>;
}

// ============================================================================
// Local data directory
// ============================================================================

/// Read-only access to files the operator staged for import.
pub trait DataDirectory: Send + Sync {
    /// File names directly under the directory, sorted
    fn list(&self) -> Result<Vec<String>>;

    fn read_bytes(&self, name: &str) -> Result<Vec<u8>>;

    fn read_text(&self, name: &str) -> Result<String>;
}

/// `DataDirectory` backed by a local folder
#[derive(Debug, Clone)]
pub struct LocalDataDirectory {
    root: PathBuf,
}

impl LocalDataDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `name` under the root; anything that could escape it is rejected.
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = name.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::Validation(format!(
                "Local file path \"{}\" is outside the data directory",
                name
            )));
        }

        let path = self.root.join(relative);
        if !path.is_file() {
            return Err(Error::NotFound(format!(
                "Local file path \"{}\" does not exist.",
                path.display()
            )));
        }

        // symlinks pointing outside the root
        let canonical_root = self.root.canonicalize()?;
        if !path.canonicalize()?.starts_with(&canonical_root) {
            return Err(Error::Validation(format!(
                "Local file path \"{}\" is outside the data directory",
                name
            )));
        }
        Ok(path)
    }
}

impl DataDirectory for LocalDataDirectory {
    fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_bytes(&self, name: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.resolve(name)?)?)
    }

    fn read_text(&self, name: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.resolve(name)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_and_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.ps1"), "Write-Output hi").unwrap();
        std::fs::write(dir.path().join("a.exe"), [0x4d, 0x5a]).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let data = LocalDataDirectory::new(dir.path());
        assert_eq!(data.list().unwrap(), vec!["a.exe", "b.ps1"]);
        assert_eq!(data.read_bytes("a.exe").unwrap(), vec![0x4d, 0x5a]);
        assert_eq!(data.read_text("b.ps1").unwrap(), "Write-Output hi");
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let data = LocalDataDirectory::new(dir.path().join("Data"));

        assert!(matches!(
            data.read_text("../secret.txt"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            data.read_text("/etc/passwd"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let data = LocalDataDirectory::new(dir.path());
        assert!(matches!(data.read_bytes("absent.dll"), Err(Error::NotFound(_))));
        assert!(LocalDataDirectory::new(dir.path().join("missing"))
            .list()
            .unwrap()
            .is_empty());
    }
}
