//! Mock implementations of core traits for testing.
//!
//! [`MockSandboxApi`] keeps sandboxes in memory and records every call it
//! receives, so tests can assert on the exact sequence of requests a sandbox
//! handle issues without a running service.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::{
    traits::SandboxApi,
    types::{
        CreateSandboxRequest, IPythonCellResult, RunIPythonCellRequest, RunShellCommandRequest,
        Sandbox, ShellCommandResult, ToolOutput,
    },
    Error, Result,
};

// =============================================================================
// Mock Sandbox API
// =============================================================================

/// A call received by [`MockSandboxApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Create { space: String, name: String },
    Get { space: String, name: String },
    Delete { space: String, name: String },
    RunIPythonCell { space: String, name: String, code: String },
    RunShellCommand { space: String, name: String, command: String },
}

/// Scripted shell reply: what the command "printed" and how it exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockShellReply {
    pub stdout: String,
    pub stderr: String,
    pub return_code: i32,
}

/// In-memory stand-in for the sandbox service.
pub struct MockSandboxApi {
    base_url: String,
    sandboxes: Mutex<HashMap<(String, String), Sandbox>>,
    calls: Mutex<Vec<ApiCall>>,
    shell_replies: Mutex<VecDeque<MockShellReply>>,
    healthy: AtomicBool,
    fail_deletes: AtomicBool,
    next_id: AtomicUsize,
    poll_interval: Duration,
}

impl MockSandboxApi {
    pub fn new() -> Self {
        Self {
            base_url: "http://mock.invalid/v1".to_string(),
            sandboxes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            shell_replies: Mutex::new(VecDeque::new()),
            healthy: AtomicBool::new(true),
            fail_deletes: AtomicBool::new(false),
            next_id: AtomicUsize::new(0),
            poll_interval: Duration::from_millis(10),
        }
    }

    /// Queue replies for upcoming shell commands, consumed in order.
    pub fn with_shell_replies(self, replies: Vec<MockShellReply>) -> Self {
        self.shell_replies.lock().extend(replies);
        self
    }

    /// Toggle the health endpoint.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Make every delete fail with a server error.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }

    /// Number of calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    /// Number of sandboxes currently stored.
    pub fn sandbox_count(&self) -> usize {
        self.sandboxes.lock().len()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().push(call);
    }

    fn require(&self, space: &str, name: &str) -> Result<Sandbox> {
        self.sandboxes
            .lock()
            .get(&(space.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::not_found(space, name))
    }
}

impl Default for MockSandboxApi {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxApi for MockSandboxApi {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn check_health(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    fn health_poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn create_sandbox(&self, space: &str, request: &CreateSandboxRequest) -> Result<Sandbox> {
        let name = request.name.clone().unwrap_or_else(|| {
            format!("mock-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
        });
        self.record(ApiCall::Create {
            space: space.to_string(),
            name: name.clone(),
        });

        let mut sandboxes = self.sandboxes.lock();
        let key = (space.to_string(), name.clone());
        if sandboxes.contains_key(&key) {
            return Err(Error::protocol(
                201,
                409,
                format!("sandbox {:?} already exists", name),
            ));
        }
        let sandbox = Sandbox {
            space: space.to_string(),
            name,
            spec: request.spec.clone(),
        };
        sandboxes.insert(key, sandbox.clone());
        Ok(sandbox)
    }

    fn get_sandbox(&self, space: &str, name: &str) -> Result<Sandbox> {
        self.record(ApiCall::Get {
            space: space.to_string(),
            name: name.to_string(),
        });
        self.require(space, name)
    }

    fn delete_sandbox(&self, space: &str, name: &str) -> Result<()> {
        self.record(ApiCall::Delete {
            space: space.to_string(),
            name: name.to_string(),
        });
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::protocol(204, 500, "Internal Server Error"));
        }
        match self
            .sandboxes
            .lock()
            .remove(&(space.to_string(), name.to_string()))
        {
            Some(_) => Ok(()),
            None => Err(Error::protocol(
                204,
                404,
                format!("sandbox {:?} not found", name),
            )),
        }
    }

    fn run_ipython_cell(
        &self,
        space: &str,
        name: &str,
        request: &RunIPythonCellRequest,
    ) -> Result<IPythonCellResult> {
        self.record(ApiCall::RunIPythonCell {
            space: space.to_string(),
            name: name.to_string(),
            code: request.code.clone(),
        });
        self.require(space, name)?;

        let echoed = format!("{}\n", request.code);
        let output = if request.split_output {
            ToolOutput::Split {
                stdout: echoed,
                stderr: String::new(),
            }
        } else {
            ToolOutput::Combined { output: echoed }
        };
        Ok(IPythonCellResult { output })
    }

    fn run_shell_command(
        &self,
        space: &str,
        name: &str,
        request: &RunShellCommandRequest,
    ) -> Result<ShellCommandResult> {
        self.record(ApiCall::RunShellCommand {
            space: space.to_string(),
            name: name.to_string(),
            command: request.command.clone(),
        });
        self.require(space, name)?;

        let reply = self
            .shell_replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| MockShellReply {
                stdout: "[mock] command executed\n".to_string(),
                stderr: String::new(),
                return_code: 0,
            });
        let output = if request.split_output {
            ToolOutput::Split {
                stdout: reply.stdout,
                stderr: reply.stderr,
            }
        } else {
            ToolOutput::Combined {
                output: format!("{}{}", reply.stdout, reply.stderr),
            }
        };
        Ok(ShellCommandResult {
            output,
            return_code: reply.return_code,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SandboxSpec;

    #[test]
    fn test_mock_assigns_names_and_round_trips() {
        let api = MockSandboxApi::new();
        let spec = SandboxSpec::new("img:v1").with_env("FOO", "bar");
        let created = api
            .create_sandbox("default", &CreateSandboxRequest::new(spec.clone()))
            .unwrap();
        assert!(!created.name.is_empty());

        let fetched = api.get_sandbox("default", &created.name).unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.spec, spec);
    }

    #[test]
    fn test_get_after_delete_is_not_found() {
        let api = MockSandboxApi::new();
        let created = api
            .create_sandbox("default", &CreateSandboxRequest::new(SandboxSpec::new("img")))
            .unwrap();
        api.delete_sandbox("default", &created.name).unwrap();

        let err = api.get_sandbox("default", &created.name).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_wait_until_healthy_times_out() {
        let api = MockSandboxApi::new();
        api.set_healthy(false);

        let start = std::time::Instant::now();
        let err = api
            .wait_until_healthy(Duration::from_millis(100))
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_wait_until_healthy_returns_immediately_when_up() {
        let api = MockSandboxApi::new();
        api.wait_until_healthy(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_scripted_shell_reply_respects_split_flag() {
        let api = MockSandboxApi::new().with_shell_replies(vec![
            MockShellReply {
                stdout: "a\n".into(),
                stderr: "b\n".into(),
                return_code: 3,
            },
            MockShellReply {
                stdout: "a\n".into(),
                stderr: "b\n".into(),
                return_code: 3,
            },
        ]);
        let created = api
            .create_sandbox("default", &CreateSandboxRequest::new(SandboxSpec::new("img")))
            .unwrap();

        let combined = api
            .run_shell_command("default", &created.name, &RunShellCommandRequest::new("x"))
            .unwrap();
        assert_eq!(combined.text(), Some("a\nb\n"));
        assert_eq!(combined.return_code, 3);

        let split = api
            .run_shell_command(
                "default",
                &created.name,
                &RunShellCommandRequest::new("x").split(),
            )
            .unwrap();
        assert_eq!(split.output.as_split(), Some(("a\n", "b\n")));
    }
}
