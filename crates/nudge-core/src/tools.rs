//! Tool execution support for the conversation engine.
//!
//! The model asks for tools by name with a JSON arguments string. The engine
//! hands each call to a [`ToolExecutor`], which answers with a JSON result
//! string that is fed back to the model as a `tool` message. Executors never
//! fail the engine loop: bad arguments and unknown names come back as
//! error-shaped results the model can read and recover from.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::message::ToolCall;

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// The tool call ID this result corresponds to.
    pub tool_call_id: String,
    /// JSON-encoded result (sent back to the model verbatim).
    pub content: String,
    /// Whether the tool execution succeeded.
    pub success: bool,
}

impl ToolResult {
    /// Create a successful tool result from a JSON value.
    pub fn success(tool_call_id: impl Into<String>, content: Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.to_string(),
            success: true,
        }
    }

    /// Create an error-shaped result: `{"status":"error","message":...}`.
    pub fn error(tool_call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: json!({ "status": "error", "message": message.into() }).to_string(),
            success: false,
        }
    }
}

/// A parsed request to execute a tool.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    /// Correlation id of the originating call.
    pub id: String,
    /// Name of the tool to execute.
    pub name: String,
    /// Arguments as a JSON object.
    pub arguments: Map<String, Value>,
}

impl ToolRequest {
    /// Parse arguments from a JSON string.
    ///
    /// An empty or whitespace-only string is treated as `{}`; models emit
    /// that for parameterless functions.
    pub fn from_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments_json: &str,
    ) -> Result<Self, serde_json::Error> {
        let arguments = if arguments_json.trim().is_empty() {
            Map::new()
        } else {
            serde_json::from_str(arguments_json)?
        };
        Ok(Self {
            id: id.into(),
            name: name.into(),
            arguments,
        })
    }

    /// Parse the arguments of a model-issued tool call.
    pub fn from_tool_call(call: &ToolCall) -> Result<Self, serde_json::Error> {
        Self::from_call(call.id.clone(), call.name.clone(), &call.arguments)
    }

    /// Get an argument by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }
}

/// Trait for executing tools called by the model.
///
/// Execution is synchronous and local. Implementations own whatever state
/// their tools touch; [`snapshot`](ToolExecutor::snapshot) and
/// [`restore`](ToolExecutor::restore) let the engine persist that state
/// alongside the conversation.
pub trait ToolExecutor: Send {
    /// Execute a tool call and return its JSON result.
    fn execute(&mut self, call: &ToolCall) -> ToolResult;

    /// List the tools this executor supports.
    fn supported_tools(&self) -> Vec<&str>;

    /// Schemas advertised to the model.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Serializable view of the executor's state.
    fn snapshot(&self) -> Value {
        Value::Null
    }

    /// Restore state previously produced by [`snapshot`](ToolExecutor::snapshot).
    fn restore(&mut self, _state: &Value) {}
}

/// Static schema for one function tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name the model uses to call the tool.
    pub name: String,
    /// What the tool does, for the model.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: ParameterSchema,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Object schema for tool arguments.
///
/// `properties` and `required` are always serialized, as `{}` and `[]` when
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl ParameterSchema {
    /// An object schema with no properties.
    pub fn object() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Add a property, optionally marking it required.
    pub fn property(mut self, name: impl Into<String>, schema: PropertySchema, required: bool) -> Self {
        let name = name.into();
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self::object()
    }
}

/// Schema of a single argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
}

impl PropertySchema {
    pub fn integer(description: impl Into<String>) -> Self {
        Self {
            kind: "integer".to_string(),
            description: description.into(),
            allowed: None,
        }
    }

    /// Restrict the property to a fixed set of values.
    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.allowed = Some(values);
        self
    }
}
