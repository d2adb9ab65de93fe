//! Config - 통합 설정 관리
//!
//! - `elite.rs` - EliteConfig 통합 설정

mod elite;

pub use elite::{EliteConfig, ELITE_CONFIG_FILE, TOKEN_ENV};
