use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::Router;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::schema_for_type,
    model::{
        CallToolRequestParams, CallToolResult, Implementation, JsonObject, ListToolsResult,
        PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
    },
    schemars::{self, JsonSchema},
    service::{RequestContext, RoleServer},
};
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use anyhow::{Result, anyhow};
use crate::config::ServerConfig;
use crate::history::HistoryStore;

pub const SERVER_NAME: &str = "workflow-history-mcp";
pub const MCP_PATH: &str = "/mcp";
pub const GET_CHAT_SESSION_HISTORY: &str = "get_chat_session_history";

#[derive(Debug, Error)]
pub enum ToolCallError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(serde_json::Error),

    #[error("Failed to encode result: {0}")]
    Encode(serde_json::Error),
}

impl From<ToolCallError> for McpError {
    fn from(err: ToolCallError) -> Self {
        match err {
            ToolCallError::UnknownTool(_) => McpError::invalid_request(err.to_string(), None),
            ToolCallError::InvalidParams(_) => McpError::invalid_params(err.to_string(), None),
            ToolCallError::Encode(_) => McpError::internal_error(err.to_string(), None),
        }
    }
}

/// Parameters for get_chat_session_history
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetChatSessionHistoryParams {
    /// Chat session id; the log is read from ~/.workflow/chat_session_<id>.log
    #[serde(default)]
    pub session_id: Option<String>,
}

type ToolHandler = fn(&HistoryStore, JsonObject) -> Result<Value, ToolCallError>;

pub struct RegisteredTool {
    pub description: &'static str,
    pub input_schema: Arc<JsonObject>,
    handler: ToolHandler,
}

/// Name-to-handler dispatch table, built once at startup.
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, RegisteredTool>,
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self { tools: BTreeMap::new() }
    }

    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::empty();
        registry.register(
            GET_CHAT_SESSION_HISTORY,
            "Return the chat history for a given session id from ~/.workflow/chat_session_<id>.log.",
            schema_for_type::<GetChatSessionHistoryParams>().into(),
            get_chat_session_history,
        );
        registry
    }

    pub fn register(
        &mut self,
        name: &'static str,
        description: &'static str,
        input_schema: Arc<JsonObject>,
        handler: ToolHandler,
    ) {
        self.tools.insert(name, RegisteredTool { description, input_schema, handler });
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    pub fn list(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .map(|(name, tool)| Tool::new(*name, tool.description, tool.input_schema.clone()))
            .collect()
    }

    pub fn call(&self, store: &HistoryStore, name: &str, arguments: JsonObject) -> Result<Value, ToolCallError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolCallError::UnknownTool(name.to_string()))?;
        (tool.handler)(store, arguments)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_builtin_tools()
    }
}

fn get_chat_session_history(store: &HistoryStore, arguments: JsonObject) -> Result<Value, ToolCallError> {
    let params: GetChatSessionHistoryParams =
        serde_json::from_value(Value::Object(arguments)).map_err(ToolCallError::InvalidParams)?;
    let session_id = params.session_id.unwrap_or_default();
    let response = store.fetch(&session_id);
    serde_json::to_value(response).map_err(ToolCallError::Encode)
}

#[derive(Clone)]
pub struct HistoryMcpServer {
    store: HistoryStore,
    tools: Arc<ToolRegistry>,
}

impl HistoryMcpServer {
    pub fn new(store: HistoryStore, tools: Arc<ToolRegistry>) -> Self {
        Self { store, tools }
    }
}

impl ServerHandler for HistoryMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                title: Some("Workflow chat history".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Reads chat session logs from ~/.workflow. \
                Call get_chat_session_history with a session_id to get the full log text."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            meta: None,
            tools: self.tools.list(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = %request.name, "Tool call received");
        let value = self.tools.call(
            &self.store,
            request.name.as_ref(),
            request.arguments.unwrap_or_default(),
        )?;
        Ok(CallToolResult::structured(value))
    }
}

/// MCP streamable HTTP service nested at [`MCP_PATH`].
pub fn mcp_router(store: HistoryStore, shutdown: CancellationToken) -> Router {
    let tools = Arc::new(ToolRegistry::with_builtin_tools());
    let config = StreamableHttpServerConfig {
        cancellation_token: shutdown,
        ..Default::default()
    };

    let service = StreamableHttpService::new(
        move || Ok(HistoryMcpServer::new(store.clone(), tools.clone())),
        Arc::new(LocalSessionManager::default()),
        config,
    );

    Router::new().nest_service(MCP_PATH, service)
}

pub async fn start_server(config: &ServerConfig, store: HistoryStore, shutdown: CancellationToken) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind to {}: {}", addr, e);
        anyhow!("Failed to bind to {}: {}", addr, e)
    })?;

    tracing::info!("MCP server listening on http://{}{}", addr, MCP_PATH);

    let router = mcp_router(store, shutdown.clone());
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("MCP server stopped");
    Ok(())
}
