//! Error types for Elite
//!
//! 콘솔 전체의 에러를 중앙에서 관리. 어떤 에러도 콘솔 프로세스를 종료시키지 않는다.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Elite 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 입력 관련 (로컬 복구)
    // ========================================================================
    /// Malformed input or wrong argument count. `usage` is printed verbatim.
    #[error("Usage: {usage}")]
    Usage { usage: String, input: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // ========================================================================
    // 원격 관련
    // ========================================================================
    /// The task queue or tasking detail service rejected or failed a call.
    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Usage 에러 생성 헬퍼
    pub fn usage(usage: impl Into<String>, input: impl Into<String>) -> Self {
        Error::Usage {
            usage: usage.into(),
            input: input.into(),
        }
    }
}
