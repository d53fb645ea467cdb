//! MCP tool server for larkdoc.
//!
//! Exposes the document pipeline as two tools over the stdio transport:
//! - `analysis_docx`: summarize a Lark document
//! - `get_lark_doc_content`: return its raw text

mod server;

pub use server::{DocServer, SERVER_NAME, serve_stdio};
