//! Covenant REST client
//!
//! 모든 collaborator trait (AgentDirectory, TaskQueue, TaskingDetail,
//! LauncherCatalog)을 하나의 HTTP 클라이언트로 구현한다.

use crate::error::ProviderError;
use crate::wire::{
    apply_options, sharpshell_template, template_id, GruntDto, GruntTaskingDto, LauncherDto,
    NewTaskingDto, CONTROL_TASK_ID,
};
use async_trait::async_trait;
use elite_foundation::{EliteConfig, Result};
use elite_task::{
    Agent, AgentDirectory, AgentId, Launcher, LauncherCatalog, TaskDescriptor, TaskField,
    TaskKind, TaskQueue, TaskRecord, TaskingDetail, TaskingId,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the team server API
#[derive(Debug, Clone)]
pub struct CovenantClient {
    client: Client,
    base_url: Url,
}

impl CovenantClient {
    /// Build from configuration. A token is required.
    pub fn from_config(config: &EliteConfig) -> std::result::Result<Self, ProviderError> {
        let token = config.token().ok_or_else(|| {
            ProviderError::NotConfigured(
                "No API token configured (use --token or ELITE_TOKEN)".to_string(),
            )
        })?;
        Self::new(config.base_url(), &token, config.timeout(), config.insecure())
    }

    pub fn new(
        base_url: &str,
        token: &str,
        timeout: Duration,
        insecure: bool,
    ) -> std::result::Result<Self, ProviderError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::NotConfigured(format!("Invalid base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::NotConfigured(format!(
                "Invalid base URL: {}",
                base_url
            )));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ProviderError::NotConfigured(format!("Invalid token: {}", e)))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        if insecure {
            warn!("TLS certificate verification disabled for {}", base_url);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ========================================================================
    // Request plumbing
    // ========================================================================

    /// `<base>/api/<segments...>`, each segment percent-encoded
    fn url(&self, segments: &[&str]) -> std::result::Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ProviderError::NotConfigured(format!("Invalid base URL: {}", self.base_url))
            })?;
            path.pop_if_empty().push("api").extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> std::result::Result<RequestBuilder, ProviderError> {
        let url = self.url(segments)?;
        debug!("Team server request: {} {}", method, url);
        Ok(self.client.request(method, url))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> std::result::Result<T, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_http_status(status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> std::result::Result<T, ProviderError> {
        self.send(self.request(Method::GET, segments)?).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> std::result::Result<T, ProviderError> {
        self.send(self.request(method, segments)?.json(body)).await
    }

    /// Lookups answer `null` instead of 404 on some server builds.
    async fn get_grunt(&self, segments: &[&str], what: &str) -> std::result::Result<Agent, ProviderError> {
        let grunt: Option<GruntDto> = self.get(segments).await.map_err(|e| match e {
            ProviderError::NotFound(_) => ProviderError::NotFound(what.to_string()),
            other => other,
        })?;
        grunt
            .map(Agent::from)
            .ok_or_else(|| ProviderError::NotFound(what.to_string()))
    }

    // ========================================================================
    // Tasking submission
    // ========================================================================

    async fn post_tasking(&self, task: &TaskDescriptor, task_id: i32) -> std::result::Result<TaskingId, ProviderError> {
        let agent = task.agent_id.to_string();
        let created: GruntTaskingDto = self
            .send_json(
                Method::POST,
                &["grunts", &agent, "taskings"],
                &NewTaskingDto::new(task, task_id),
            )
            .await?;
        created
            .id()
            .ok_or_else(|| ProviderError::InvalidResponse("created tasking has no id".to_string()))
    }

    /// Fetch the template, overwrite the staged options, store it back and
    /// return its id.
    async fn prepare_template(&self, task: &TaskDescriptor) -> std::result::Result<i32, ProviderError> {
        let mut template: Value = self.get(&["grunttasks", task.kind.name()]).await?;
        apply_options(&mut template, &task.options, &task.cleared)?;
        let updated: Value = self
            .send_json(Method::PUT, &["grunttasks"], &template)
            .await?;
        template_id(&updated).or_else(|_| template_id(&template))
    }

    async fn create_sharpshell_template(&self, task: &TaskDescriptor) -> std::result::Result<i32, ProviderError> {
        let code = task.option(TaskField::Code).ok_or_else(|| {
            ProviderError::InvalidRequest("SharpShell task has no code".to_string())
        })?;
        let created: Value = self
            .send_json(Method::POST, &["grunttasks"], &sharpshell_template(code))
            .await?;
        template_id(&created)
    }
}

// ============================================================================
// Collaborator implementations
// ============================================================================

#[async_trait]
impl AgentDirectory for CovenantClient {
    async fn agents(&self) -> Result<Vec<Agent>> {
        let grunts: Vec<GruntDto> = self.get(&["grunts"]).await?;
        Ok(grunts.into_iter().map(Agent::from).collect())
    }

    async fn agent_by_id(&self, id: AgentId) -> Result<Agent> {
        let id = id.to_string();
        Ok(self
            .get_grunt(&["grunts", &id], &format!("Grunt {}", id))
            .await?)
    }

    async fn agent_by_name(&self, name: &str) -> Result<Agent> {
        Ok(self
            .get_grunt(&["grunts", name], &format!("Grunt {}", name))
            .await?)
    }

    async fn agent_by_guid(&self, guid: &str) -> Result<Agent> {
        Ok(self
            .get_grunt(&["grunts", "guid", guid], &format!("Grunt {}", guid))
            .await?)
    }
}

#[async_trait]
impl TaskQueue for CovenantClient {
    async fn submit(&self, task: &TaskDescriptor) -> Result<TaskingId> {
        let task_id = match task.kind {
            kind if kind.is_control() => CONTROL_TASK_ID,
            TaskKind::SharpShell => self.create_sharpshell_template(task).await?,
            _ => self.prepare_template(task).await?,
        };
        let id = self.post_tasking(task, task_id).await?;
        debug!(tasking = %id, kind = %task.kind, name = %task.name, "Tasking submitted");
        Ok(id)
    }
}

#[async_trait]
impl TaskingDetail for CovenantClient {
    async fn list(&self, agent: AgentId) -> Result<Vec<TaskRecord>> {
        let id = agent.to_string();
        let taskings: Vec<GruntTaskingDto> =
            self.get(&["grunts", &id, "taskings", "detail"]).await?;
        let records = taskings
            .into_iter()
            .map(|t| t.into_record(agent))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn detail(&self, agent: AgentId, tasking: TaskingId) -> Result<TaskRecord> {
        let (id, tid) = (agent.to_string(), tasking.to_string());
        let dto: GruntTaskingDto = self
            .get(&["grunts", &id, "taskings", &tid, "detail"])
            .await?;
        Ok(dto.into_record(agent)?)
    }
}

#[async_trait]
impl LauncherCatalog for CovenantClient {
    async fn launchers(&self) -> Result<Vec<Launcher>> {
        let launchers: Vec<LauncherDto> = self.get(&["launchers"]).await?;
        Ok(launchers.into_iter().map(Launcher::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> CovenantClient {
        CovenantClient::new(base, "token", Duration::from_secs(5), true).unwrap()
    }

    #[test]
    fn test_url_building_encodes_segments() {
        let client = client("https://team:7443");
        let url = client.url(&["grunts", "my grunt", "taskings"]).unwrap();
        assert_eq!(url.as_str(), "https://team:7443/api/grunts/my%20grunt/taskings");
    }

    #[test]
    fn test_url_building_keeps_base_path() {
        let client = client("https://team:7443/covenant/");
        let url = client.url(&["launchers"]).unwrap();
        assert_eq!(url.as_str(), "https://team:7443/covenant/api/launchers");
    }

    #[test]
    fn test_from_config_requires_token() {
        let config = EliteConfig::new();
        assert!(matches!(
            CovenantClient::from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));

        let config = EliteConfig::new().with_token("abc");
        assert!(CovenantClient::from_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(CovenantClient::new("not a url", "t", Duration::from_secs(1), false).is_err());
    }
}
