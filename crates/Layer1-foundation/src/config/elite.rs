//! Elite Config - 통합 설정
//!
//! 글로벌(<config_dir>/elite/config.json) + 프로젝트(.elite/config.json) 병합

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// 설정 파일명
pub const ELITE_CONFIG_FILE: &str = "config.json";

/// Environment variable consulted when no token is configured.
pub const TOKEN_ENV: &str = "ELITE_TOKEN";

const DEFAULT_BASE_URL: &str = "https://localhost:7443";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Elite Config
// ============================================================================

/// Console configuration. Every field is optional so layers can be merged;
/// accessors supply the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EliteConfig {
    /// Team server REST endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Bearer token for the REST API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Accept self-signed server certificates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Transport timeout for a single HTTP call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Directory that file-import commands read from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Coloured console output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
}

impl EliteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();
        for store in [JsonStore::global(), JsonStore::current_project()]
            .into_iter()
            .flatten()
        {
            config.merge(Self::load_from(&store)?);
        }
        Ok(config)
    }

    /// One layer. A missing file is an empty layer.
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        match store.load_optional::<EliteConfig>(ELITE_CONFIG_FILE)? {
            Some(config) => {
                debug!("Loaded config from {}", store.base_dir().display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn save_global(&self) -> Result<()> {
        JsonStore::global()?.save(ELITE_CONFIG_FILE, self)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: EliteConfig) {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.token.is_some() {
            self.token = other.token;
        }
        if other.insecure.is_some() {
            self.insecure = other.insecure;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.color.is_some() {
            self.color = other.color;
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn token(&self) -> Option<String> {
        self.token.clone().filter(|t| !t.is_empty())
    }

    pub fn insecure(&self) -> bool {
        self.insecure.unwrap_or(false)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("elite")
                .join("Data")
        })
    }

    pub fn color(&self) -> bool {
        self.color.unwrap_or(true)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Fill a missing token from `lookup(TOKEN_ENV)`.
    pub fn with_token_fallback(mut self, lookup: impl FnOnce(&str) -> Option<String>) -> Self {
        if self.token().is_none() {
            self.token = lookup(TOKEN_ENV).filter(|t| !t.is_empty());
        }
        self
    }
}
