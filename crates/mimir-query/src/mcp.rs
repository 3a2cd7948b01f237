//! MCP (Model Context Protocol) server integration.
//!
//! Exposes the tool registry over the Model Context Protocol so external
//! LLM clients can discover and call the lookup tool.
//!
//! Uses `rust-mcp-sdk` for protocol handling.

use std::sync::Arc;

use async_trait::async_trait;
use rust_mcp_sdk::{
    McpServer, StdioTransport, ToMcpServerHandler, TransportOptions,
    mcp_server::{McpServerOptions, ServerHandler, server_runtime},
    schema::{
        CallToolRequestParams, CallToolResult, Implementation, InitializeResult,
        LATEST_PROTOCOL_VERSION, ListToolsResult, PaginatedRequestParams, RpcError,
        ServerCapabilities, ServerCapabilitiesTools, TextContent, Tool as McpTool, ToolInputSchema,
    },
};
use tracing::info;

use crate::error::{QueryError, Result};
use crate::tools::ToolRegistry;

// ============================================================================
// MCP Server Configuration
// ============================================================================

/// Configuration for the MCP server.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Server name for identification.
    pub name: String,
    /// Server version.
    pub version: String,
    /// Optional instructions for the LLM.
    pub instructions: Option<String>,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            name: "mimir".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: None,
        }
    }
}

impl McpServerConfig {
    /// Create a new configuration with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the server version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set instructions for the LLM.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

// ============================================================================
// MCP Server Handler
// ============================================================================

/// MCP server handler that bridges the tool registry to the protocol.
pub struct MimirServerHandler {
    tools: Arc<ToolRegistry>,
}

impl MimirServerHandler {
    /// Create a new handler with the given tool registry.
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        info!("Initializing Mimir MCP server handler");
        Self { tools }
    }
}

#[async_trait]
impl ServerHandler for MimirServerHandler {
    async fn handle_list_tools_request(
        &self,
        _params: Option<PaginatedRequestParams>,
        _runtime: Arc<dyn McpServer>,
    ) -> std::result::Result<ListToolsResult, RpcError> {
        let tools: Vec<McpTool> = self
            .tools
            .definitions()
            .into_iter()
            .map(|t| {
                let input_schema: ToolInputSchema = serde_json::from_value(t.input_schema)
                    .unwrap_or_else(|_| ToolInputSchema::new(vec![], None, None));

                McpTool {
                    name: t.name,
                    description: Some(t.description),
                    input_schema,
                    annotations: None,
                    execution: None,
                    icons: vec![],
                    meta: None,
                    output_schema: None,
                    title: None,
                }
            })
            .collect();

        Ok(ListToolsResult {
            tools,
            meta: None,
            next_cursor: None,
        })
    }

    async fn handle_call_tool_request(
        &self,
        params: CallToolRequestParams,
        _runtime: Arc<dyn McpServer>,
    ) -> std::result::Result<CallToolResult, rust_mcp_sdk::schema::schema_utils::CallToolError>
    {
        let args = serde_json::Value::Object(params.arguments.unwrap_or_default());

        let result = self.tools.execute(&params.name, args).await;

        Ok(CallToolResult {
            content: vec![TextContent::new(result.content().to_string(), None, None).into()],
            is_error: if result.is_error() { Some(true) } else { None },
            meta: None,
            structured_content: None,
        })
    }
}

// ============================================================================
// MCP Server Runner
// ============================================================================

/// Run an MCP server on stdio transport with the given tool registry.
///
/// Blocks until the transport is closed by the peer or the process is
/// terminated externally.
pub async fn run_mcp_server(tools: Arc<ToolRegistry>, config: McpServerConfig) -> Result<()> {
    info!("Starting MCP server: {}", config.name);

    let server_details = InitializeResult {
        server_info: Implementation {
            name: config.name.clone(),
            version: config.version.clone(),
            title: Some(format!("{} MCP Server", config.name)),
            description: Some("Semantic document lookup exposed via MCP".to_string()),
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools { list_changed: None }),
            ..Default::default()
        },
        meta: None,
        instructions: config.instructions,
        protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
    };

    let transport = StdioTransport::new(TransportOptions::default())
        .map_err(|e| QueryError::Protocol(format!("Failed to create transport: {}", e)))?;

    let handler = MimirServerHandler::new(tools).to_mcp_server_handler();

    let server = server_runtime::create_server(McpServerOptions {
        server_details,
        transport,
        handler,
        task_store: None,
        client_task_store: None,
    });

    info!("MCP server starting on stdio transport");
    server
        .start()
        .await
        .map_err(|e| QueryError::Protocol(format!("MCP server failed: {}", e)))?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
