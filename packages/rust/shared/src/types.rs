//! Request-scoped types for a single document pipeline run.
//!
//! Nothing here outlives one tool invocation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ToolRequest
// ---------------------------------------------------------------------------

/// Arguments accepted by the document tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolRequest {
    /// 飞书文档URL，例如：https://bytedance.larkoffice.com/docx/OS9YdoucMoHnISxlHzLcD3AIngg
    #[serde(rename = "documentUrl")]
    pub document_url: String,
}

// ---------------------------------------------------------------------------
// ResolvedIdentifier
// ---------------------------------------------------------------------------

/// Raw identifier extracted from a document URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentifier {
    /// The `<token>` path segment.
    pub raw_id: String,
    /// Whether the URL contains `/wiki/` anywhere.
    pub is_wiki: bool,
}

// ---------------------------------------------------------------------------
// AccessToken
// ---------------------------------------------------------------------------

/// Tenant bearer token, issued per request. May be empty.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct AccessToken {
    value: String,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &if self.is_empty() { "<empty>" } else { "<redacted>" })
            .finish()
    }
}

// ---------------------------------------------------------------------------
// DocumentId
// ---------------------------------------------------------------------------

/// Content-bearing identifier used for the raw-content fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// DocumentContent / SummaryResult
// ---------------------------------------------------------------------------

/// Raw text of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContent {
    pub text: String,
}

impl DocumentContent {
    /// Placeholder used when the content endpoint returns no text.
    pub const FALLBACK_TEXT: &'static str = "test";

    /// Build from an optional upstream value, substituting the placeholder
    /// for a missing or empty string.
    pub fn from_upstream(content: Option<String>) -> Self {
        let text = content
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| Self::FALLBACK_TEXT.to_string());
        Self { text }
    }
}

/// Text returned by the summarizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    pub text: String,
}
