//! RMCP 0.3.2 implementation for the LLDB bridge tools
//!
//! Both tools always succeed at the MCP level; failures come back as text
//! starting with "ERROR".

use rmcp::{
    tool, tool_router, tool_handler, ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::*,
    ErrorData as McpError,
};
use tracing::info;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use super::types::*;
use crate::config::Config;
use crate::lldb_client::LldbClient;

pub const INSTRUCTIONS: &str =
    "You can run most lldb commands, ALWAYS start with lldb_init unless specified otherwise";

/// LLDB bridge tool handler
#[derive(Clone)]
pub struct LldbToolHandler {
    #[allow(dead_code)]
    tool_router: ToolRouter<LldbToolHandler>,
    client: Arc<LldbClient>,
}

impl LldbToolHandler {
    pub fn new(config: Config) -> Self {
        Self::with_client(Arc::new(LldbClient::new(config.host, config.port)))
    }

    pub fn with_client(client: Arc<LldbClient>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            client,
        }
    }

    pub fn client(&self) -> &LldbClient {
        &self.client
    }
}

#[tool_router]
impl LldbToolHandler {
    #[tool(name = "lldb_init", description = "Load executable and launch process with stop-at-entry")]
    async fn lldb_init(&self, Parameters(args): Parameters<LldbInitArgs>) -> Result<CallToolResult, McpError> {
        info!("lldb_init: {}", args.fullpath);
        let text = self.client.init(Path::new(&args.fullpath)).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(name = "lldb", description = "Send a single LLDB command and return its output")]
    async fn lldb(&self, Parameters(args): Parameters<LldbArgs>) -> Result<CallToolResult, McpError> {
        let text = self.client.send(&args.command).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for LldbToolHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}
