use serde_json::Value;

use crate::error::Result;

/// A callable exposed to agent frameworks.
pub trait Tool: Send + Sync {
    /// Get the unique name of the tool.
    fn name(&self) -> &str;

    /// Get the human-readable description.
    fn description(&self) -> &str;

    /// Get the JSON Schema for parameters.
    fn parameters(&self) -> Value;

    /// Run the tool and return its textual result.
    fn call(&self, args: &Value) -> Result<String>;
}
