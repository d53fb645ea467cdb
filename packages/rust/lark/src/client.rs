//! HTTP client for the Lark open platform.
//!
//! Three calls are involved: tenant token issuance, wiki node lookup, and raw
//! docx content. None of them inspect the HTTP status: the body is parsed as
//! JSON regardless and missing fields are handled per call.

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use larkdoc_shared::{
    AccessToken, DocumentContent, DocumentId, HttpConfig, LarkConfig, LarkDocError,
    ResolvedIdentifier, Result,
};

/// User-Agent string for outbound requests.
const USER_AGENT: &str = concat!("larkdoc/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    tenant_access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NodeResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<NodeData>,
}

#[derive(Debug, Deserialize)]
struct NodeData {
    #[serde(default)]
    node: Option<WikiNode>,
}

#[derive(Debug, Deserialize)]
struct WikiNode {
    #[serde(default)]
    obj_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawContentResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<RawContentData>,
}

#[derive(Debug, Deserialize)]
struct RawContentData {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// LarkClient
// ---------------------------------------------------------------------------

/// Build a reqwest client with the configured per-request timeout.
pub fn build_client(http: &HttpConfig) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(http.timeout())
        .build()
        .map_err(|e| LarkDocError::Network(format!("failed to build HTTP client: {e}")))
}

/// Client for the Lark token, wiki and docx endpoints.
#[derive(Debug, Clone)]
pub struct LarkClient {
    client: Client,
    auth_base_url: String,
    open_api_base_url: String,
}

impl LarkClient {
    /// Create a client on top of an existing reqwest client.
    pub fn with_client(client: Client, config: &LarkConfig) -> Self {
        Self {
            client,
            auth_base_url: config.auth_base_url.trim_end_matches('/').to_string(),
            open_api_base_url: config.open_api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Exchange the application id/secret for a tenant access token.
    ///
    /// A response without `tenant_access_token` yields an empty token rather
    /// than an error; the authenticated calls that follow will fail instead.
    #[instrument(skip_all)]
    pub async fn tenant_access_token(&self, app_id: &str, app_secret: &str) -> Result<AccessToken> {
        let body = self.request_token(app_id, app_secret).await?;

        match body.tenant_access_token {
            Some(token) if !token.is_empty() => {
                debug!("tenant access token issued");
                Ok(AccessToken::new(token))
            }
            _ => {
                warn!(
                    detail = %upstream_detail(body.code, body.msg.as_deref()),
                    "token response carried no tenant_access_token"
                );
                Ok(AccessToken::default())
            }
        }
    }

    /// Like [`LarkClient::tenant_access_token`], but a missing token is an error
    /// carrying the platform's `code`/`msg`.
    #[instrument(skip_all)]
    pub async fn require_tenant_access_token(
        &self,
        app_id: &str,
        app_secret: &str,
    ) -> Result<AccessToken> {
        let body = self.request_token(app_id, app_secret).await?;

        match body.tenant_access_token {
            Some(token) if !token.is_empty() => {
                debug!("tenant access token issued");
                Ok(AccessToken::new(token))
            }
            _ => Err(LarkDocError::rejected(
                "获取tenant_access_token失败",
                upstream_detail(body.code, body.msg.as_deref()),
            )),
        }
    }

    async fn request_token(&self, app_id: &str, app_secret: &str) -> Result<TokenResponse> {
        let url = format!(
            "{}/auth/v3/tenant_access_token/internal/",
            self.auth_base_url
        );

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "app_id": app_id,
                "app_secret": app_secret,
            }))
            .send()
            .await
            .map_err(|e| LarkDocError::Network(format!("{url}: {e}")))?;

        read_json(response, &url).await
    }

    /// Turn a resolved identifier into the id of the content-bearing document.
    ///
    /// Non-wiki identifiers are returned unchanged without any network call.
    #[instrument(skip_all, fields(raw_id = %resolved.raw_id, is_wiki = resolved.is_wiki))]
    pub async fn locate(
        &self,
        resolved: &ResolvedIdentifier,
        token: &AccessToken,
    ) -> Result<DocumentId> {
        if !resolved.is_wiki {
            return Ok(DocumentId::new(resolved.raw_id.clone()));
        }

        let url = self.open_api_url(&["wiki", "v2", "spaces", "get_node"])?;

        let response = self
            .client
            .get(url.clone())
            .query(&[("token", resolved.raw_id.as_str())])
            .header(AUTHORIZATION, bearer(token))
            .send()
            .await
            .map_err(|e| LarkDocError::Network(format!("{url}: {e}")))?;

        let body: NodeResponse = read_json(response, url.as_str()).await?;

        let obj_token = body
            .data
            .and_then(|d| d.node)
            .and_then(|n| n.obj_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                LarkDocError::lookup(format!(
                    "wiki node {} has no data.node.obj_token ({})",
                    resolved.raw_id,
                    upstream_detail(body.code, body.msg.as_deref())
                ))
            })?;

        debug!(%obj_token, "wiki node resolved");
        Ok(DocumentId::new(obj_token))
    }

    /// Fetch the plain-text content of a docx document.
    ///
    /// A missing or empty `data.content` is replaced by
    /// [`DocumentContent::FALLBACK_TEXT`].
    #[instrument(skip_all, fields(document_id = %document_id))]
    pub async fn raw_content(
        &self,
        document_id: &DocumentId,
        token: &AccessToken,
    ) -> Result<DocumentContent> {
        let content = self.fetch_raw_content(document_id, token).await?;
        if content.is_none() {
            warn!("document content is empty, using placeholder text");
        }
        Ok(DocumentContent::from_upstream(content))
    }

    /// Fetch the plain-text content of a docx document, failing with
    /// [`LarkDocError::EmptyDocument`] when there is none.
    #[instrument(skip_all, fields(document_id = %document_id))]
    pub async fn raw_text(&self, document_id: &DocumentId, token: &AccessToken) -> Result<String> {
        self.fetch_raw_content(document_id, token)
            .await?
            .ok_or_else(|| LarkDocError::EmptyDocument {
                document_id: document_id.to_string(),
            })
    }

    /// `Ok(None)` when `data.content` is missing or empty.
    async fn fetch_raw_content(
        &self,
        document_id: &DocumentId,
        token: &AccessToken,
    ) -> Result<Option<String>> {
        let url = self.open_api_url(&[
            "docx",
            "v1",
            "documents",
            document_id.as_str(),
            "raw_content",
        ])?;

        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, bearer(token))
            .send()
            .await
            .map_err(|e| LarkDocError::Network(format!("{url}: {e}")))?;

        let body: RawContentResponse = read_json(response, url.as_str()).await?;

        let Some(data) = body.data else {
            if body.code.is_some() || body.msg.is_some() {
                return Err(LarkDocError::rejected(
                    "获取文档内容失败",
                    upstream_detail(body.code, body.msg.as_deref()),
                ));
            }
            return Err(LarkDocError::parse(format!("{url}: response has no data")));
        };

        Ok(data.content.filter(|c| !c.is_empty()))
    }

    /// Join path segments onto the open-API base, percent-encoding each one.
    fn open_api_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.open_api_base_url).map_err(|e| {
            LarkDocError::config(format!(
                "invalid open_api_base_url '{}': {e}",
                self.open_api_base_url
            ))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                LarkDocError::config(format!(
                    "open_api_base_url '{}' cannot be a base",
                    self.open_api_base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn bearer(token: &AccessToken) -> String {
    format!("Bearer {}", token.as_str())
}

/// Read the body as text and decode it as JSON, whatever the status code.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> Result<T> {
    let status = response.status();
    debug!(%url, %status, "upstream responded");

    let text = response
        .text()
        .await
        .map_err(|e| LarkDocError::Network(format!("{url}: failed to read body: {e}")))?;

    serde_json::from_str(&text).map_err(|e| {
        LarkDocError::parse(format!(
            "{url}: HTTP {status}, invalid JSON: {e} (got: {})",
            text.chars().take(200).collect::<String>()
        ))
    })
}

/// Render the platform's `code`/`msg` envelope for log and error messages.
fn upstream_detail(code: Option<i64>, msg: Option<&str>) -> String {
    match (code, msg) {
        (Some(code), Some(msg)) => format!("code {code}: {msg}"),
        (Some(code), None) => format!("code {code}"),
        (None, Some(msg)) => msg.to_string(),
        (None, None) => "no upstream detail".to_string(),
    }
}
