//! # elite-foundation
//!
//! Foundation layer for Elite:
//! - Error: 중앙 에러 타입 (Usage, Validation, NotFound, Remote ...)
//! - Config: 통합 설정 (EliteConfig)
//! - Storage: JsonStore (범용)

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{EliteConfig, ELITE_CONFIG_FILE, TOKEN_ENV};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;
