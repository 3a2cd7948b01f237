//! mimir-query: query pipeline and MCP tool surface
//!
//! This crate provides the query side of Mimir:
//! - Text embedding client (OpenAI-compatible API)
//! - The answer pipeline: embed, search, resolve, join
//! - Tool abstraction and the `who` lookup tool
//! - MCP server exposing the tools over stdio

pub mod embedder;
pub mod error;
pub mod mcp;
pub mod service;
pub mod tools;

pub use embedder::{MockEmbedder, OpenAiConfig, OpenAiEmbedder, TextEmbedder};
pub use error::{QueryError, Result};
pub use mcp::{McpServerConfig, MimirServerHandler, run_mcp_server};
pub use service::{NO_RESULTS_MESSAGE, QueryService};
pub use tools::{Tool, ToolDefinition, ToolRegistry, ToolResult, WhoTool, create_query_tools};
