//! # elite-provider
//!
//! Team server REST adapter for Elite.
//! Implements the agent directory, task queue, tasking detail and launcher
//! catalog collaborators over a single authenticated HTTP client.
//!
//! ## Features
//! - Bearer token authentication, optional self-signed TLS
//! - Task template fetch / option overwrite / store before tasking
//! - Ad-hoc SharpShell templates
//! - Tolerant decoding of string or numeric enum fields

pub mod client;
pub mod error;
mod wire;

pub use client::CovenantClient;
pub use error::ProviderError;
