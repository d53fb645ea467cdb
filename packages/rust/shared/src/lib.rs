//! Shared types, error model, and configuration for larkdoc.
//!
//! This crate is the foundation depended on by all other larkdoc crates.
//! It provides:
//! - [`LarkDocError`]: the unified error type
//! - Request-scoped types ([`ResolvedIdentifier`], [`AccessToken`], [`DocumentId`], ...)
//! - Configuration ([`AppConfig`], [`Credentials`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ArkConfig, Credentials, HttpConfig, LarkConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{LarkDocError, Result};
pub use types::{
    AccessToken, DocumentContent, DocumentId, ResolvedIdentifier, SummaryResult, ToolRequest,
};
