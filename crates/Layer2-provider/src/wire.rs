//! Team server wire format
//!
//! JSON은 camelCase. enum 필드는 서버 빌드에 따라 문자열 또는 숫자로 온다.

use crate::error::ProviderError;
use chrono::{DateTime, NaiveDateTime, Utc};
use elite_task::{
    Agent, AgentId, Launcher, TaskDescriptor, TaskField, TaskRecord, TaskStatus, TaskingId,
    TaskingType,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Task id the queue expects for control taskings, which have no template
pub(crate) const CONTROL_TASK_ID: i32 = 1;

// ============================================================================
// Helpers
// ============================================================================

/// Enum-ish field as text (`"Active"` or `3` → `"3"`)
fn enum_text(value: &Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn status_from(value: &Option<Value>) -> TaskStatus {
    match value {
        Some(Value::String(s)) => TaskStatus::from_name(s),
        Some(Value::Number(n)) => n.as_i64().and_then(TaskStatus::from_index),
        _ => None,
    }
    .unwrap_or_default()
}

fn tasking_type_from(value: &Option<Value>) -> TaskingType {
    match value {
        Some(Value::String(s)) => TaskingType::from_name(s),
        Some(Value::Number(n)) => n.as_i64().and_then(TaskingType::from_index),
        _ => None,
    }
    .unwrap_or_default()
}

/// Server timestamps may omit the offset; those are UTC.
pub(crate) fn parse_time(value: Option<&str>) -> Option<DateTime<Utc>> {
    let text = value?.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// ============================================================================
// Grunt
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GruntDto {
    id: Option<i32>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    guid: String,
    #[serde(default)]
    children: Vec<String>,
    comm_type: Option<Value>,
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    ip_address: String,
    #[serde(default)]
    user_domain_name: String,
    #[serde(default)]
    user_name: String,
    status: Option<Value>,
    integrity: Option<Value>,
    #[serde(default)]
    operating_system: String,
    #[serde(default)]
    process: String,
    #[serde(default)]
    delay: i32,
    #[serde(default)]
    jitter_percent: i32,
    #[serde(default)]
    connect_attempts: i32,
    last_check_in: Option<String>,
    activation_time: Option<String>,
    kill_date: Option<String>,
}

impl From<GruntDto> for Agent {
    fn from(dto: GruntDto) -> Self {
        Agent {
            id: dto.id.map(AgentId),
            comm_type: enum_text(&dto.comm_type),
            status: enum_text(&dto.status),
            integrity: enum_text(&dto.integrity),
            last_check_in: parse_time(dto.last_check_in.as_deref()),
            activation_time: parse_time(dto.activation_time.as_deref()),
            kill_date: parse_time(dto.kill_date.as_deref()),
            name: dto.name,
            guid: dto.guid,
            children: dto.children,
            hostname: dto.hostname,
            ip_address: dto.ip_address,
            user_domain_name: dto.user_domain_name,
            user_name: dto.user_name,
            operating_system: dto.operating_system,
            process: dto.process,
            delay: dto.delay,
            jitter_percent: dto.jitter_percent,
            connect_attempts: dto.connect_attempts,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LauncherDto {
    id: Option<i32>,
    #[serde(default)]
    name: String,
}

impl From<LauncherDto> for Launcher {
    fn from(dto: LauncherDto) -> Self {
        Launcher {
            id: dto.id,
            name: dto.name,
        }
    }
}

// ============================================================================
// Tasking
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GruntTaskingDto {
    id: Option<i32>,
    #[serde(default)]
    name: String,
    grunt_id: Option<i32>,
    status: Option<Value>,
    #[serde(rename = "type")]
    tasking_type: Option<Value>,
    tasking_message: Option<String>,
    tasking_command: Option<String>,
    tasking_user: Option<String>,
    token_task: Option<bool>,
    completion_time: Option<String>,
    grunt_task_output: Option<String>,
}

impl GruntTaskingDto {
    pub(crate) fn id(&self) -> Option<TaskingId> {
        self.id.map(TaskingId)
    }

    /// Records without a server id are not reconcilable.
    pub(crate) fn into_record(self, agent: AgentId) -> Result<TaskRecord, ProviderError> {
        let id = self.id().ok_or_else(|| {
            ProviderError::InvalidResponse(format!("tasking {} has no id", self.name))
        })?;
        Ok(TaskRecord {
            id,
            agent_id: self.grunt_id.map(AgentId).unwrap_or(agent),
            status: status_from(&self.status),
            tasking_type: tasking_type_from(&self.tasking_type),
            completion_time: parse_time(self.completion_time.as_deref()),
            name: self.name,
            message: self.tasking_message.unwrap_or_default(),
            command: self.tasking_command.unwrap_or_default(),
            tasking_user: self.tasking_user.unwrap_or_default(),
            token_task: self.token_task.unwrap_or(false),
            output: self.grunt_task_output.unwrap_or_default(),
        })
    }
}

/// Body of `POST /api/grunts/{id}/taskings`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewTaskingDto<'a> {
    id: i32,
    name: &'a str,
    grunt_id: i32,
    task_id: i32,
    status: &'static str,
    #[serde(rename = "type")]
    tasking_type: &'static str,
    tasking_message: &'a str,
    tasking_command: &'a str,
    token_task: bool,
}

impl<'a> NewTaskingDto<'a> {
    pub(crate) fn new(task: &'a TaskDescriptor, task_id: i32) -> Self {
        Self {
            id: 0,
            name: &task.name,
            grunt_id: task.agent_id.0,
            task_id,
            status: task.status.display_name(),
            tasking_type: task.tasking_type().display_name(),
            tasking_message: &task.message,
            tasking_command: &task.command,
            token_task: task.token_task,
        }
    }
}

// ============================================================================
// Task template
// ============================================================================

/// Template id of a `GET`/`PUT /api/grunttasks` body
pub(crate) fn template_id(template: &Value) -> Result<i32, ProviderError> {
    template
        .get("id")
        .and_then(Value::as_i64)
        .and_then(|id| i32::try_from(id).ok())
        .ok_or_else(|| ProviderError::InvalidResponse("task template has no id".to_string()))
}

/// Overwrite template option values with the staged ones. Cleared options
/// fall back to the template's default value.
pub(crate) fn apply_options(
    template: &mut Value,
    staged: &[(TaskField, String)],
    cleared: &[TaskField],
) -> Result<(), ProviderError> {
    let template_name = template
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let options = template
        .get_mut("options")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| {
            ProviderError::InvalidResponse(format!("task {} has no options", template_name))
        })?;

    for (field, value) in staged {
        find_option(options, &template_name, *field)?["value"] = Value::String(value.clone());
    }
    for field in cleared {
        let option = find_option(options, &template_name, *field)?;
        let default = option
            .get("defaultValue")
            .cloned()
            .filter(|v| !v.is_null())
            .unwrap_or_else(|| Value::String(String::new()));
        option["value"] = default;
    }
    Ok(())
}

fn find_option<'v>(
    options: &'v mut [Value],
    template_name: &str,
    field: TaskField,
) -> Result<&'v mut Value, ProviderError> {
    options
        .iter_mut()
        .find(|o| {
            o.get("name")
                .and_then(Value::as_str)
                .map(|n| n.eq_ignore_ascii_case(field.option_name()))
                .unwrap_or(false)
        })
        .ok_or_else(|| {
            ProviderError::InvalidRequest(format!("Task {} has no option {}", template_name, field))
        })
}

// ============================================================================
// SharpShell
// ============================================================================

const SHARPSHELL_USINGS: &str = "using System;
using System.IO;
using System.Linq;
using System.Text;
using System.Security;
using System.Security.Principal;
using System.Collections.Generic;

using SharpSploit.Credentials;
using SharpSploit.Enumeration;
using SharpSploit.Execution;
using SharpSploit.Generic;
using SharpSploit.Misc;
";

/// Wrap a C# snippet in the `Task.Execute()` entry point.
pub(crate) fn sharpshell_code(snippet: &str) -> String {
    format!(
        "{}\npublic static class Task\n{{\n    public static object Execute()\n    {{\n        {}\n    }}\n}}",
        SHARPSHELL_USINGS, snippet
    )
}

/// Body of `POST /api/grunttasks` for an ad-hoc SharpShell template
pub(crate) fn sharpshell_template(snippet: &str) -> Value {
    serde_json::json!({
        "name": "SharpShell",
        "description": "Execute custom c# code from SharpShell.",
        "referenceAssemblies": [
            "System.DirectoryServices.dll",
            "System.IdentityModel.dll",
            "System.Management.dll",
            "System.Management.Automation.dll"
        ],
        "referenceSourceLibraries": ["SharpSploit"],
        "embeddedResources": [],
        "code": sharpshell_code(snippet),
        "options": []
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use elite_task::TaskKind;
    use serde_json::json;

    #[test]
    fn test_tasking_accepts_numeric_and_string_enums() {
        let dto: GruntTaskingDto = serde_json::from_value(json!({
            "id": 12,
            "name": "a1b2c3d4e5",
            "gruntId": 3,
            "status": 3,
            "type": "Assembly",
            "taskingCommand": "whoami",
            "taskingUser": "admin",
            "completionTime": "2024-02-01T10:00:00",
            "gruntTaskOutput": "corp\\bob"
        }))
        .unwrap();

        let record = dto.into_record(AgentId(3)).unwrap();
        assert_eq!(record.id, TaskingId(12));
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.tasking_type, TaskingType::Assembly);
        assert!(record.completion_time.is_some());
        assert!(record.is_final());
    }

    #[test]
    fn test_tasking_without_id_is_rejected() {
        let dto: GruntTaskingDto =
            serde_json::from_value(json!({ "name": "x", "status": "Tasked" })).unwrap();
        assert!(dto.into_record(AgentId(1)).is_err());
    }

    #[test]
    fn test_grunt_conversion() {
        let dto: GruntDto = serde_json::from_value(json!({
            "id": 4,
            "name": "grunt4",
            "guid": "abcdef",
            "children": ["fedcba"],
            "commType": "HTTP",
            "userDomainName": "CORP",
            "userName": "bob",
            "integrity": 2,
            "lastCheckIn": "2024-02-01T10:00:00Z"
        }))
        .unwrap();
        let agent: Agent = dto.into();
        assert_eq!(agent.id, Some(AgentId(4)));
        assert_eq!(agent.qualified_user(), "CORP\\bob");
        assert_eq!(agent.integrity, "2");
        assert!(agent.has_child("FEDCBA"));
    }

    #[test]
    fn test_apply_options() {
        let mut template = json!({
            "id": 9,
            "name": "GetDomainUser",
            "options": [
                { "name": "Identities", "value": "old", "defaultValue": "" },
                { "name": "LDAPFilter", "value": "" }
            ]
        });
        apply_options(&mut template, &[], &[TaskField::Identities]).unwrap();
        assert_eq!(template["options"][0]["value"], "");

        apply_options(
            &mut template,
            &[(TaskField::Identities, "alice".to_string())],
            &[],
        )
        .unwrap();
        assert_eq!(template["options"][0]["value"], "alice");
        assert_eq!(template_id(&template).unwrap(), 9);

        let missing = apply_options(&mut template, &[(TaskField::Ports, "80".into())], &[]);
        assert!(matches!(missing, Err(ProviderError::InvalidRequest(_))));
    }

    #[test]
    fn test_new_tasking_body() {
        let task = TaskDescriptor {
            id: None,
            agent_id: AgentId(2),
            name: "0123456789".into(),
            kind: TaskKind::Connect,
            message: "dc01,gruntsvc".into(),
            command: "Connect dc01".into(),
            status: TaskStatus::Uninitialized,
            token_task: false,
            options: vec![],
            cleared: vec![],
        };
        let body = serde_json::to_value(NewTaskingDto::new(&task, CONTROL_TASK_ID)).unwrap();
        assert_eq!(body["type"], "Connect");
        assert_eq!(body["gruntId"], 2);
        assert_eq!(body["taskingMessage"], "dc01,gruntsvc");
        assert_eq!(body["status"], "Uninitialized");
    }

    #[test]
    fn test_sharpshell_wraps_snippet() {
        let code = sharpshell_code("return 1 + 1;");
        assert!(code.contains("public static object Execute()"));
        assert!(code.contains("        return 1 + 1;"));
        assert_eq!(sharpshell_template("x")["name"], "SharpShell");
    }
}
