//! Tool abstraction for the MCP surface.
//!
//! - `Tool`: an individual operation exposed to external callers
//! - `ToolRegistry`: name-keyed collection that routes execution
//! - `WhoTool`: the lookup operation backed by the query service

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};
use crate::service::QueryService;

// ============================================================================
// Tool Trait and Result Types
// ============================================================================

/// A tool that can be executed by an external caller.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name for this tool.
    fn name(&self) -> &str;

    /// Human-readable description for the caller.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's input parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given parameters.
    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult>;

    /// Convert this tool to a definition for protocol listings.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters_schema())
    }
}

/// A tool definition as advertised over the protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name of the tool.
    pub name: String,

    /// Description of what the tool does.
    pub description: String,

    /// JSON Schema for the tool's input parameters.
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Result from executing a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    content: String,
    is_error: bool,
}

impl ToolResult {
    /// Create a successful text result.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
        }
    }

    /// Check if this result is an error.
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// The text content of this result.
    pub fn content(&self) -> &str {
        &self.content
    }
}

// ============================================================================
// Tool Registry
// ============================================================================

/// Registry of tools, routing execution requests by tool name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool with the registry.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Register a tool (Arc version).
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get definitions of all registered tools.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool by name.
    ///
    /// An unknown tool name yields an error result, not a fault.
    pub async fn execute(&self, name: &str, params: serde_json::Value) -> ToolResult {
        match self.tools.get(name) {
            Some(tool) => match tool.execute(params).await {
                Ok(result) => result,
                Err(e) => ToolResult::error(e.to_string()),
            },
            None => ToolResult::error(format!("Tool '{}' is not registered", name)),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// WhoTool
// ============================================================================

/// The lookup operation: find the stored document nearest to a name.
pub struct WhoTool {
    service: Arc<QueryService>,
}

impl WhoTool {
    /// Create the tool over a query service.
    pub fn new(service: Arc<QueryService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for WhoTool {
    fn name(&self) -> &str {
        "who"
    }

    fn description(&self) -> &str {
        "Get information about a person based on their name."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The name to query against the database for similar content"
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult> {
        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                QueryError::InvalidRequest("Missing required parameter 'name'".to_string())
            })?;

        // The service renders its own failures into the returned string,
        // so this is always a text result.
        Ok(ToolResult::text(self.service.answer(name).await))
    }
}

/// Create the tool set backed by a query service.
pub fn create_query_tools(service: Arc<QueryService>) -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(WhoTool::new(service))]
}
