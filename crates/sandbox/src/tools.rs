//! Sandbox tools implementing the `Tool` trait.
//!
//! These let agent frameworks run code in a sandbox. Several tools may share
//! one sandbox; it is deleted when the last tool holding it is dropped.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

use sandboxai_core::{traits::Tool, Error, Result};

use crate::handle::Sandbox;
use crate::scope::ScopedSandbox;

/// A sandbox shared between tools.
pub type SharedSandbox = Arc<Mutex<ScopedSandbox>>;

/// Wrap `sandbox` for sharing between tools.
pub fn share(sandbox: Sandbox) -> SharedSandbox {
    Arc::new(Mutex::new(sandbox.scoped()))
}

fn embedded_sandbox() -> Result<SharedSandbox> {
    Ok(share(Sandbox::builder().embedded(true).build()?))
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::invalid_arguments(format!("{} is required", key)))
}

// =============================================================================
// IPython Cell Tool
// =============================================================================

/// Tool for running IPython cells in a sandbox.
pub struct RunIPythonCellTool {
    sandbox: SharedSandbox,
}

impl RunIPythonCellTool {
    pub fn new(sandbox: SharedSandbox) -> Self {
        Self { sandbox }
    }

    /// Create the tool with its own sandbox on the embedded server.
    pub fn embedded() -> Result<Self> {
        Ok(Self::new(embedded_sandbox()?))
    }

    pub fn sandbox(&self) -> &SharedSandbox {
        &self.sandbox
    }
}

impl Tool for RunIPythonCellTool {
    fn name(&self) -> &str {
        "run_ipython_cell"
    }

    fn description(&self) -> &str {
        "Run python and shell commands in an ipython cell. \
         Shell commands should be on a new line and start with a !."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "cell": {
                    "type": "string",
                    "description": "The code to execute in the ipython cell."
                }
            },
            "required": ["cell"]
        })
    }

    fn call(&self, args: &Value) -> Result<String> {
        let cell = required_str(args, "cell")?;
        let result = self.sandbox.lock().run_ipython_cell(cell)?;
        Ok(result.text().unwrap_or_default().to_string())
    }
}

// =============================================================================
// Shell Command Tool
// =============================================================================

/// Tool for running shell commands in a sandbox.
pub struct RunShellCommandTool {
    sandbox: SharedSandbox,
}

impl RunShellCommandTool {
    pub fn new(sandbox: SharedSandbox) -> Self {
        Self { sandbox }
    }

    /// Create the tool with its own sandbox on the embedded server.
    pub fn embedded() -> Result<Self> {
        Ok(Self::new(embedded_sandbox()?))
    }

    pub fn sandbox(&self) -> &SharedSandbox {
        &self.sandbox
    }
}

impl Tool for RunShellCommandTool {
    fn name(&self) -> &str {
        "run_shell_command"
    }

    fn description(&self) -> &str {
        "Run bash shell commands in a sandbox."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The bash commands to execute."
                }
            },
            "required": ["command"]
        })
    }

    fn call(&self, args: &Value) -> Result<String> {
        let command = required_str(args, "command")?;
        let result = self.sandbox.lock().run_shell_command(command)?;
        Ok(result.text().unwrap_or_default().to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================
