//! rmcp server handler wrapping [`DocumentPipeline`].
//!
//! Tool calls never fail at the protocol level: the pipeline already folds
//! every error into its returned text, which is sent back as a single text
//! content block.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::transport::stdio;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt, tool, tool_handler, tool_router};
use tracing::{debug, info};

use larkdoc_core::DocumentPipeline;
use larkdoc_shared::{LarkDocError, ToolRequest};

/// Name advertised in the MCP `initialize` response.
pub const SERVER_NAME: &str = "docx_mcp";

/// MCP server exposing the Lark document tools.
#[derive(Clone)]
pub struct DocServer {
    pipeline: Arc<DocumentPipeline>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl DocServer {
    pub fn new(pipeline: DocumentPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(name = "analysis_docx", description = "解析飞书文档")]
    pub async fn analysis_docx(
        &self,
        params: Parameters<ToolRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        debug!(url = %request.document_url, "analysis_docx called");
        let text = self.pipeline.analyze(&request.document_url).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(name = "get_lark_doc_content", description = "获取飞书文档内容")]
    pub async fn get_lark_doc_content(
        &self,
        params: Parameters<ToolRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        debug!(url = %request.document_url, "get_lark_doc_content called");
        let text = self.pipeline.read_content(&request.document_url).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for DocServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Summarize or read Lark documents. Pass a /docx/ or /wiki/ URL as documentUrl."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Serve the tools over stdin/stdout until the client disconnects.
pub async fn serve_stdio(pipeline: DocumentPipeline) -> larkdoc_shared::Result<()> {
    info!(server = SERVER_NAME, "starting MCP server on stdio");

    let running = DocServer::new(pipeline)
        .serve(stdio())
        .await
        .map_err(|e| LarkDocError::Transport(format!("failed to start stdio server: {e}")))?;

    let reason = running
        .waiting()
        .await
        .map_err(|e| LarkDocError::Transport(format!("stdio server task failed: {e}")))?;

    info!(?reason, "MCP server stopped");
    Ok(())
}
