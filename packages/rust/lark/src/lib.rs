//! Lark open-platform access: document URL resolution and the HTTP calls
//! needed to turn a URL into raw document text.
//!
//! This crate provides:
//! - [`resolve`]: classifies a `/docx/` or `/wiki/` URL and extracts its token
//! - [`LarkClient`]: tenant token issuance, wiki node lookup, raw content fetch

mod client;
mod resolver;

pub use client::{LarkClient, build_client};
pub use resolver::resolve;
