//! End-to-end document pipeline: URL → token → (wiki lookup) → raw content → summary.
//!
//! This module is the single place where pipeline errors are turned into
//! user-visible text. Callers always receive a `String`; a failure is
//! reported as `处理文档时出错: <message>` rather than as an error value.

use tracing::{error, info, instrument};

use larkdoc_lark::{LarkClient, build_client, resolve};
use larkdoc_shared::{AccessToken, AppConfig, Credentials, DocumentId, LarkDocError, Result};
use larkdoc_summarizer::Summarizer;

/// Prefix of every failure text produced by the pipeline.
pub const FAILURE_PREFIX: &str = "处理文档时出错";

/// Used when an error carries no message.
pub const UNKNOWN_ERROR: &str = "未知错误";

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Pipeline state machine. Every stage may move directly to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    ResolvingUrl,
    FetchingToken,
    LocatingDocument,
    FetchingContent,
    Summarizing,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ResolvingUrl => "resolving_url",
            Self::FetchingToken => "fetching_token",
            Self::LocatingDocument => "locating_document",
            Self::FetchingContent => "fetching_content",
            Self::Summarizing => "summarizing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called on every stage transition, including `Done` and `Failed`.
    fn stage(&self, stage: PipelineStage);
    /// Called once when the pipeline fails, with the stage it failed in.
    fn failed(&self, _at: PipelineStage, _error: &LarkDocError) {}
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: PipelineStage) {}
}

/// Tracks the current stage and forwards transitions to the reporter.
struct StageTracker<'a> {
    current: PipelineStage,
    progress: &'a dyn ProgressReporter,
}

impl<'a> StageTracker<'a> {
    fn new(progress: &'a dyn ProgressReporter) -> Self {
        progress.stage(PipelineStage::Start);
        Self {
            current: PipelineStage::Start,
            progress,
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        self.current = stage;
        self.progress.stage(stage);
    }

    /// Terminal step: map the outcome to the text returned to the caller.
    fn finish(mut self, outcome: Result<String>) -> String {
        match outcome {
            Ok(text) => {
                self.enter(PipelineStage::Done);
                text
            }
            Err(e) => {
                let at = self.current;
                error!(stage = %at, error = %e, "document pipeline failed");
                self.progress.failed(at, &e);
                self.enter(PipelineStage::Failed);
                failure_text(&e.to_string())
            }
        }
    }
}

/// Render the user-visible failure text for an error message.
pub fn failure_text(message: &str) -> String {
    let message = if message.trim().is_empty() {
        UNKNOWN_ERROR
    } else {
        message
    };
    format!("{FAILURE_PREFIX}: {message}")
}

// ---------------------------------------------------------------------------
// DocumentPipeline
// ---------------------------------------------------------------------------

/// Sequential orchestration of the Lark calls and the summarizer.
///
/// Holds no per-request state; one instance serves any number of calls.
#[derive(Debug, Clone)]
pub struct DocumentPipeline {
    lark: LarkClient,
    summarizer: Summarizer,
    credentials: Credentials,
}

impl DocumentPipeline {
    /// Build the pipeline from the start-up configuration. Both clients share
    /// one connection pool and the configured timeout.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = build_client(&config.http)?;
        Ok(Self {
            lark: LarkClient::with_client(client.clone(), &config.lark),
            summarizer: Summarizer::with_client(
                client,
                &config.ark,
                config.credentials.api_key.clone(),
            ),
            credentials: config.credentials.clone(),
        })
    }

    /// Summarize the document behind `url`.
    pub async fn analyze(&self, url: &str) -> String {
        self.analyze_with(url, &SilentProgress).await
    }

    /// [`DocumentPipeline::analyze`] with a progress observer.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn analyze_with(&self, url: &str, progress: &dyn ProgressReporter) -> String {
        info!("analyzing document");
        let mut tracker = StageTracker::new(progress);

        let outcome = async {
            let (document_id, token) = self
                .locate_document(url, TokenPolicy::Deferred, &mut tracker)
                .await?;
            tracker.enter(PipelineStage::FetchingContent);
            let content = self.lark.raw_content(&document_id, &token).await?;
            tracker.enter(PipelineStage::Summarizing);
            Ok::<_, LarkDocError>(self.summarizer.summarize(&content).await.text)
        }
        .await;

        tracker.finish(outcome)
    }

    /// Return the raw text of the document behind `url`, without summarizing.
    pub async fn read_content(&self, url: &str) -> String {
        self.read_content_with(url, &SilentProgress).await
    }

    /// [`DocumentPipeline::read_content`] with a progress observer.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn read_content_with(&self, url: &str, progress: &dyn ProgressReporter) -> String {
        info!("reading document content");
        let mut tracker = StageTracker::new(progress);

        let outcome = async {
            let (document_id, token) = self
                .locate_document(url, TokenPolicy::Required, &mut tracker)
                .await?;
            tracker.enter(PipelineStage::FetchingContent);
            self.lark.raw_text(&document_id, &token).await
        }
        .await;

        tracker.finish(outcome)
    }

    /// Steps shared by both entry points: resolve the URL, obtain a token and
    /// find the content-bearing document.
    async fn locate_document(
        &self,
        url: &str,
        policy: TokenPolicy,
        tracker: &mut StageTracker<'_>,
    ) -> Result<(DocumentId, AccessToken)> {
        tracker.enter(PipelineStage::ResolvingUrl);
        let resolved = resolve(url)?;

        tracker.enter(PipelineStage::FetchingToken);
        let (app_id, app_secret) = (&self.credentials.app_id, &self.credentials.app_secret);
        let token = match policy {
            TokenPolicy::Deferred => self.lark.tenant_access_token(app_id, app_secret).await?,
            TokenPolicy::Required => {
                self.lark
                    .require_tenant_access_token(app_id, app_secret)
                    .await?
            }
        };

        if resolved.is_wiki {
            tracker.enter(PipelineStage::LocatingDocument);
        }
        let document_id = self.lark.locate(&resolved, &token).await?;
        Ok((document_id, token))
    }
}

/// What to do when the token endpoint returns no token.
#[derive(Debug, Clone, Copy)]
enum TokenPolicy {
    /// Carry on with an empty token; the authenticated calls report the failure.
    Deferred,
    /// Fail immediately with the platform's `code`/`msg`.
    Required,
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const DOCX_URL: &str = "https://bytedance.larkoffice.com/docx/OS9YdoucMoHnISxlHzLcD3AIngg";

    fn config_for(base: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.lark.auth_base_url = base.to_string();
        config.lark.open_api_base_url = base.to_string();
        config.ark.base_url = base.to_string();
        config.ark.model = "ep-test".into();
        config.credentials = Credentials {
            app_id: "cli_test".into(),
            app_secret: "secret".into(),
            api_key: "ark-key".into(),
        };
        config
    }

    fn pipeline_for(server: &MockServer) -> DocumentPipeline {
        DocumentPipeline::new(&config_for(&server.uri())).unwrap()
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/auth/v3/tenant_access_token/internal/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "tenant_access_token": "T" })),
            )
            .mount(server)
            .await;
    }

    async fn mount_content(server: &MockServer, id: &str, content: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/docx/v1/documents/{id}/raw_content")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": { "content": content } })),
            )
            .expect(1..)
            .mount(server)
            .await;
    }

    async fn mount_completion(server: &MockServer, answer: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": answer } }],
            })))
            .mount(server)
            .await;
    }

    #[derive(Default)]
    struct RecordingProgress {
        stages: Mutex<Vec<PipelineStage>>,
        failed_at: Mutex<Option<PipelineStage>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn stage(&self, stage: PipelineStage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn failed(&self, at: PipelineStage, _error: &LarkDocError) {
            *self.failed_at.lock().unwrap() = Some(at);
        }
    }

    #[tokio::test]
    async fn docx_url_is_summarized() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_content(&server, "OS9YdoucMoHnISxlHzLcD3AIngg", "Hello").await;
        mount_completion(&server, "Summary").await;

        let progress = RecordingProgress::default();
        let text = pipeline_for(&server).analyze_with(DOCX_URL, &progress).await;
        assert_eq!(text, "Summary");

        use PipelineStage::*;
        assert_eq!(
            *progress.stages.lock().unwrap(),
            vec![Start, ResolvingUrl, FetchingToken, FetchingContent, Summarizing, Done]
        );
    }

    #[tokio::test]
    async fn wiki_url_is_redirected_to_document() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/wiki/v2/spaces/get_node"))
            .and(query_param("token", "ABC123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "node": { "obj_token": "DOC1" } },
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_content(&server, "DOC1", "World").await;
        mount_completion(&server, "World summary").await;

        let progress = RecordingProgress::default();
        let text = pipeline_for(&server)
            .analyze_with("https://x/wiki/ABC123", &progress)
            .await;
        assert_eq!(text, "World summary");
        assert!(
            progress
                .stages
                .lock()
                .unwrap()
                .contains(&PipelineStage::LocatingDocument)
        );
    }

    #[tokio::test]
    async fn invalid_url_becomes_failure_text() {
        // Nothing listens here; resolution fails before any network call.
        let pipeline = DocumentPipeline::new(&config_for("http://127.0.0.1:1")).unwrap();
        let progress = RecordingProgress::default();

        let text = pipeline.analyze_with("https://x/nope/123", &progress).await;
        assert_eq!(text, "处理文档时出错: 无效的飞书文档URL格式");
        assert_eq!(
            *progress.failed_at.lock().unwrap(),
            Some(PipelineStage::ResolvingUrl)
        );
        assert_eq!(
            progress.stages.lock().unwrap().last(),
            Some(&PipelineStage::Failed)
        );
    }

    #[tokio::test]
    async fn missing_wiki_node_becomes_failure_text() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/wiki/v2/spaces/get_node"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 131005,
                "msg": "not found",
            })))
            .mount(&server)
            .await;

        let progress = RecordingProgress::default();
        let text = pipeline_for(&server)
            .analyze_with("https://x/wiki/ABC123", &progress)
            .await;
        assert!(text.starts_with("处理文档时出错: "), "got {text}");
        assert!(text.contains("obj_token"));
        assert_eq!(
            *progress.failed_at.lock().unwrap(),
            Some(PipelineStage::LocatingDocument)
        );
    }

    #[tokio::test]
    async fn network_failure_becomes_failure_text() {
        let pipeline = DocumentPipeline::new(&config_for("http://127.0.0.1:1")).unwrap();
        let text = pipeline.analyze(DOCX_URL).await;
        assert!(text.starts_with("处理文档时出错: network error"), "got {text}");
    }

    #[tokio::test]
    async fn model_failure_is_not_a_pipeline_failure() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_content(&server, "OS9YdoucMoHnISxlHzLcD3AIngg", "Hello").await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let text = pipeline_for(&server).analyze(DOCX_URL).await;
        assert_eq!(text, larkdoc_summarizer::FAILURE_TEXT);
    }

    #[tokio::test]
    async fn repeated_calls_are_identical() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_content(&server, "OS9YdoucMoHnISxlHzLcD3AIngg", "Hello").await;
        mount_completion(&server, "Summary").await;

        let pipeline = pipeline_for(&server);
        let first = pipeline.analyze(DOCX_URL).await;
        let second = pipeline.analyze(DOCX_URL).await;
        assert_eq!(first, second);
        assert_eq!(first, "Summary");
    }

    #[tokio::test]
    async fn read_content_skips_summarizer() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_content(&server, "OS9YdoucMoHnISxlHzLcD3AIngg", "Hello").await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let text = pipeline_for(&server).read_content(DOCX_URL).await;
        assert_eq!(text, "Hello");
        server.verify().await;
    }

    #[tokio::test]
    async fn read_content_reports_empty_document() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_content(&server, "D1", "").await;

        let text = pipeline_for(&server).read_content("https://x/docx/D1").await;
        assert_eq!(text, "处理文档时出错: 文档内容为空, document D1");
    }

    #[tokio::test]
    async fn analyze_still_summarizes_placeholder_for_empty_document() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_content(&server, "D1", "").await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "messages": [{ "role": "system" }, { "role": "user", "content": "test" }],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "Placeholder summary" } }],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = pipeline_for(&server).analyze("https://x/docx/D1").await;
        assert_eq!(text, "Placeholder summary");
    }

    #[tokio::test]
    async fn read_content_fails_early_without_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v3/tenant_access_token/internal/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 10003,
                "msg": "invalid param",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 99991661,
                "msg": "Missing access token",
            })))
            .expect(0)
            .mount(&server)
            .await;

        let progress = RecordingProgress::default();
        let text = pipeline_for(&server)
            .read_content_with("https://x/docx/D1", &progress)
            .await;
        assert_eq!(
            text,
            "处理文档时出错: 获取tenant_access_token失败: code 10003: invalid param"
        );
        assert_eq!(
            *progress.failed_at.lock().unwrap(),
            Some(PipelineStage::FetchingToken)
        );
        server.verify().await;
    }

    #[tokio::test]
    async fn analyze_defers_missing_token_to_content_fetch() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v3/tenant_access_token/internal/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 10003,
                "msg": "invalid param",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/docx/v1/documents/D1/raw_content"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 99991661,
                "msg": "Missing access token",
            })))
            .mount(&server)
            .await;

        let text = pipeline_for(&server).analyze("https://x/docx/D1").await;
        assert_eq!(
            text,
            "处理文档时出错: 获取文档内容失败: code 99991661: Missing access token"
        );
    }

    #[tokio::test]
    async fn summarizer_shares_the_configured_client() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_content(&server, "D1", "Hello").await;

        let user_agent = concat!("larkdoc/", env!("CARGO_PKG_VERSION"));
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("user-agent", user_agent))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "Summary" } }],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = pipeline_for(&server).analyze("https://x/docx/D1").await;
        assert_eq!(text, "Summary");
    }

    #[test]
    fn failure_text_uses_placeholder_for_empty_message() {
        assert_eq!(failure_text(""), "处理文档时出错: 未知错误");
        assert_eq!(failure_text("boom"), "处理文档时出错: boom");
    }
}
