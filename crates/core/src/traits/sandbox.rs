use std::time::{Duration, Instant};

use crate::types::{
    CreateSandboxRequest, IPythonCellResult, RunIPythonCellRequest, RunShellCommandRequest,
    Sandbox, ShellCommandResult,
};
use crate::{Error, Result};

/// Interval between health probes in [`SandboxApi::wait_until_healthy`].
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Operations of the v1 sandbox management and tool invocation contract.
///
/// Every call blocks the calling thread. Implementations are not expected to
/// retry; failures surface to the caller as they happen.
pub trait SandboxApi: Send + Sync {
    /// Base URL requests are sent to, e.g. `http://localhost:5266/v1`.
    fn base_url(&self) -> &str;

    /// Liveness probe. Transport failures yield `false`, never an error.
    fn check_health(&self) -> bool;

    /// Liveness probe that gives up after `timeout`.
    fn check_health_within(&self, _timeout: Duration) -> bool {
        self.check_health()
    }

    /// Create a sandbox in `space`. Expects `201 Created`.
    fn create_sandbox(&self, space: &str, request: &CreateSandboxRequest) -> Result<Sandbox>;

    /// Fetch a sandbox. A `404` maps to [`Error::NotFound`].
    fn get_sandbox(&self, space: &str, name: &str) -> Result<Sandbox>;

    /// Delete a sandbox. Expects `204 No Content`.
    fn delete_sandbox(&self, space: &str, name: &str) -> Result<()>;

    fn run_ipython_cell(
        &self,
        space: &str,
        name: &str,
        request: &RunIPythonCellRequest,
    ) -> Result<IPythonCellResult>;

    fn run_shell_command(
        &self,
        space: &str,
        name: &str,
        request: &RunShellCommandRequest,
    ) -> Result<ShellCommandResult>;

    /// How long [`wait_until_healthy`](Self::wait_until_healthy) sleeps between probes.
    fn health_poll_interval(&self) -> Duration {
        HEALTH_POLL_INTERVAL
    }

    /// Poll [`check_health`](Self::check_health) until it succeeds or `timeout` elapses.
    fn wait_until_healthy(&self, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.check_health_within(timeout.saturating_sub(start.elapsed())) {
                return Ok(());
            }
            let remaining = timeout.saturating_sub(start.elapsed());
            std::thread::sleep(self.health_poll_interval().min(remaining));
        }
        Err(Error::timeout(format!(
            "sandbox service at {} did not become healthy within {:?}",
            self.base_url(),
            timeout
        )))
    }
}
