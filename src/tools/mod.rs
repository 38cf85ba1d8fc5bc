//! Tool trait and registry
//!
//! Tools are deterministic, side-effect-free operations the model can ask for.
//! The only registered tool is the financial calculator.

use crate::calculator::{calculate, CalculationKind, CalculationResult, ToolInvocation};
use crate::error::MentorError;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const CALCULATE_TOOL: &str = "calculate";

/// Tool schema as declared to the completion service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: Value,
}

/// Trait for a single tool (deterministic, synchronous execution)
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;
    fn execute(&self, input: &Value) -> Result<ToolOutput>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Schemas for every registered tool, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool by name. Unknown tools and tool faults become an error
    /// payload so the model can see what went wrong.
    pub fn dispatch(&self, name: &str, input: &Value) -> ToolOutput {
        let Some(tool) = self.get(name) else {
            warn!(tool = %name, "Model requested an unregistered tool");
            return ToolOutput {
                success: false,
                data: json!({ "error": format!("Unknown tool: {}", name) }),
            };
        };

        match tool.execute(input) {
            Ok(output) => {
                debug!(tool = %name, success = output.success, "Tool executed");
                output
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                ToolOutput {
                    success: false,
                    data: json!({ "error": e.to_string() }),
                }
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The financial calculator exposed to the model as `calculate`
pub struct CalculateTool;

impl CalculateTool {
    fn input_guide() -> String {
        CalculationKind::ALL
            .iter()
            .map(|kind| {
                let optional = kind.optional_inputs();
                if optional.is_empty() {
                    format!("{}: {}", kind, kind.required_inputs().join(", "))
                } else {
                    format!(
                        "{}: {} (optional: {})",
                        kind,
                        kind.required_inputs().join(", "),
                        optional.join(", ")
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Tool for CalculateTool {
    fn name(&self) -> &'static str {
        CALCULATE_TOOL
    }

    fn description(&self) -> &'static str {
        "Execute financial calculations like unit economics, TAM/SAM/SOM, break-even analysis, \
         and runway calculations. Use this whenever the student needs help with numbers."
    }

    fn input_schema(&self) -> Value {
        let kinds: Vec<&str> = CalculationKind::ALL.iter().map(|k| k.as_str()).collect();

        json!({
            "type": "object",
            "properties": {
                "calculation_type": {
                    "type": "string",
                    "enum": kinds,
                    "description": "The type of calculation to perform"
                },
                "inputs": {
                    "type": "object",
                    "description": format!(
                        "Key-value pairs of numeric inputs for the calculation. Expected keys - {}",
                        Self::input_guide()
                    ),
                    "additionalProperties": { "type": "number" }
                }
            },
            "required": ["calculation_type", "inputs"]
        })
    }

    fn execute(&self, input: &Value) -> Result<ToolOutput> {
        let result = match ToolInvocation::from_tool_input(input) {
            Ok(invocation) => calculate(&invocation),
            Err(MentorError::Validation(message)) => CalculationResult::error(message),
            Err(other) => return Err(other),
        };

        Ok(ToolOutput {
            success: !result.is_error(),
            data: serde_json::to_value(&result)?,
        })
    }
}

/// Create the registry used by the mentor: the calculator and nothing else.
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CalculateTool));
    registry
}
