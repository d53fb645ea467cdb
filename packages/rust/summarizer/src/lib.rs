//! Document summarization through an OpenAI-compatible chat-completion API
//! (Volcengine Ark).
//!
//! Unlike the Lark calls, summarization recovers locally: every failure is
//! logged and turned into a fixed fallback text, so [`Summarizer::summarize`]
//! never returns an error.

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use larkdoc_shared::{ArkConfig, DocumentContent, LarkDocError, Result, SummaryResult};

/// System instruction sent ahead of the document text.
pub const SYSTEM_PROMPT: &str =
    "你是一个专业的文档分析助手，请提炼文档中的关键信息并进行总结。";

/// Returned when the call fails for any reason.
pub const FAILURE_TEXT: &str = "调用AI模型分析文档时出错";

/// Returned when the model answers without any message text.
pub const EMPTY_ANSWER_TEXT: &str = "无法分析文档内容";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<AssistantMessage>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Summarizer
// ---------------------------------------------------------------------------

/// Chat-completion client bound to one model and API key.
#[derive(Clone)]
pub struct Summarizer {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summarizer")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Summarizer {
    /// Create a summarizer on top of an existing reqwest client, normally the
    /// one shared with the Lark calls.
    pub fn with_client(client: Client, config: &ArkConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
        }
    }

    /// Summarize the document text. Never fails.
    #[instrument(skip_all, fields(model = %self.model, chars = content.text.chars().count()))]
    pub async fn summarize(&self, content: &DocumentContent) -> SummaryResult {
        let text = match self.complete(&content.text).await {
            Ok(Some(answer)) => answer,
            Ok(None) => EMPTY_ANSWER_TEXT.to_string(),
            Err(e) => {
                error!(error = %e, "model call failed");
                FAILURE_TEXT.to_string()
            }
        };
        SummaryResult { text }
    }

    /// One chat-completion round trip. `Ok(None)` when the first choice has no text.
    async fn complete(&self, document: &str) -> Result<Option<String>> {
        let body = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: document,
                },
            ],
            model: &self.model,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| LarkDocError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LarkDocError::ModelApi {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LarkDocError::parse(format!("invalid chat completion response: {e}")))?;
        debug!(choices = parsed.choices.len(), "chat completion received");

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.is_empty()))
    }
}
