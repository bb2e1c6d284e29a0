//! Execution back ends of the mock server.

use std::collections::HashMap;
use std::process::Stdio;

use sandboxai_core::types::{IPythonCellResult, ShellCommandResult, ToolOutput};

/// Run `command` with the local `sh`.
///
/// In combined mode stderr is redirected into stdout before the command runs,
/// so the two streams interleave the way a terminal would show them.
pub async fn run_shell(
    command: &str,
    split_output: bool,
    env: Option<&HashMap<String, String>>,
) -> std::io::Result<ShellCommandResult> {
    let script = if split_output {
        command.to_string()
    } else {
        format!("exec 2>&1\n{}", command)
    };

    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c")
        .arg(script)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if let Some(env) = env {
        cmd.envs(env);
    }

    let out = cmd.output().await?;
    let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
    let output = if split_output {
        ToolOutput::Split {
            stdout,
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        }
    } else {
        ToolOutput::Combined { output: stdout }
    };

    Ok(ShellCommandResult {
        output,
        return_code: out.status.code().unwrap_or(-1),
    })
}

/// Echo kernel: a cell "prints" its own source.
pub fn run_cell(code: &str, split_output: bool) -> IPythonCellResult {
    let echoed = format!("{}\n", code);
    let output = if split_output {
        ToolOutput::Split {
            stdout: echoed,
            stderr: String::new(),
        }
    } else {
        ToolOutput::Combined { output: echoed }
    };
    IPythonCellResult { output }
}
