use serde::{Deserialize, Serialize};

// =============================================================================
// Tool Invocation Types
// =============================================================================

/// Body of `POST .../tools:run_ipython_cell`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIPythonCellRequest {
    pub code: String,
    #[serde(default)]
    pub split_output: bool,
}

impl RunIPythonCellRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            split_output: false,
        }
    }

    /// Ask for stdout and stderr as separate fields.
    pub fn split(mut self) -> Self {
        self.split_output = true;
        self
    }
}

/// Response body of `POST .../tools:run_ipython_cell`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIPythonCellResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

/// Body of `POST .../tools:run_shell_command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunShellCommandRequest {
    pub command: String,
    #[serde(default)]
    pub split_output: bool,
}

impl RunShellCommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            split_output: false,
        }
    }

    /// Ask for stdout and stderr as separate fields.
    pub fn split(mut self) -> Self {
        self.split_output = true;
        self
    }
}

/// Response body of `POST .../tools:run_shell_command`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunShellCommandResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    pub return_code: i32,
}

// =============================================================================
// Typed Results
// =============================================================================

/// Output of a tool invocation.
///
/// The wire format carries `output` or the `stdout`/`stderr` pair depending on
/// the request's `split_output` flag; this enum makes the two shapes exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    /// stdout and stderr interleaved into one stream.
    Combined { output: String },
    /// stdout and stderr kept apart.
    Split { stdout: String, stderr: String },
}

impl ToolOutput {
    /// Build from wire fields, selecting the shape by the flag that was sent.
    /// Absent fields become empty strings.
    pub fn from_wire(
        split_output: bool,
        output: Option<String>,
        stdout: Option<String>,
        stderr: Option<String>,
    ) -> Self {
        if split_output {
            Self::Split {
                stdout: stdout.unwrap_or_default(),
                stderr: stderr.unwrap_or_default(),
            }
        } else {
            Self::Combined {
                output: output.unwrap_or_default(),
            }
        }
    }

    /// Wire fields `(output, stdout, stderr)` for this shape.
    pub fn into_wire(self) -> (Option<String>, Option<String>, Option<String>) {
        match self {
            Self::Combined { output } => (Some(output), None, None),
            Self::Split { stdout, stderr } => (None, Some(stdout), Some(stderr)),
        }
    }

    pub fn is_split(&self) -> bool {
        matches!(self, Self::Split { .. })
    }

    pub fn as_combined(&self) -> Option<&str> {
        match self {
            Self::Combined { output } => Some(output),
            Self::Split { .. } => None,
        }
    }

    pub fn as_split(&self) -> Option<(&str, &str)> {
        match self {
            Self::Split { stdout, stderr } => Some((stdout, stderr)),
            Self::Combined { .. } => None,
        }
    }
}

/// Result of running an IPython cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IPythonCellResult {
    pub output: ToolOutput,
}

impl IPythonCellResult {
    pub fn from_response(split_output: bool, response: RunIPythonCellResponse) -> Self {
        Self {
            output: ToolOutput::from_wire(
                split_output,
                response.output,
                response.stdout,
                response.stderr,
            ),
        }
    }

    /// Combined output text, `None` for split results.
    pub fn text(&self) -> Option<&str> {
        self.output.as_combined()
    }
}

impl From<IPythonCellResult> for RunIPythonCellResponse {
    fn from(result: IPythonCellResult) -> Self {
        let (output, stdout, stderr) = result.output.into_wire();
        Self {
            output,
            stdout,
            stderr,
        }
    }
}

/// Result of running a shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommandResult {
    pub output: ToolOutput,
    pub return_code: i32,
}

impl ShellCommandResult {
    pub fn from_response(split_output: bool, response: RunShellCommandResponse) -> Self {
        Self {
            output: ToolOutput::from_wire(
                split_output,
                response.output,
                response.stdout,
                response.stderr,
            ),
            return_code: response.return_code,
        }
    }

    /// Combined output text, `None` for split results.
    pub fn text(&self) -> Option<&str> {
        self.output.as_combined()
    }

    /// Whether the command exited with code 0.
    pub fn success(&self) -> bool {
        self.return_code == 0
    }
}

impl From<ShellCommandResult> for RunShellCommandResponse {
    fn from(result: ShellCommandResult) -> Self {
        let (output, stdout, stderr) = result.output.into_wire();
        Self {
            output,
            stdout,
            stderr,
            return_code: result.return_code,
        }
    }
}
