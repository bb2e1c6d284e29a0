//! Lifecycle of the embedded `sandboxaid` process.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Once, OnceLock};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use sandboxai_core::{config::EmbeddedConfig, types::ServerInfo, Error, Result};

use crate::output::LinePump;
use crate::process::{self, Signal};

/// How long to wait for the exit status after a SIGKILL.
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait for an exit status once stdout has closed early.
const EARLY_EXIT_GRACE: Duration = Duration::from_secs(1);

static GLOBAL: OnceLock<EmbeddedServer> = OnceLock::new();
static EXIT_HOOK: Once = Once::new();

/// Supervisor for one `sandboxaid` child process.
///
/// At most one server runs per supervisor. [`EmbeddedServer::global`] is the
/// process-wide instance used by sandbox handles; it is stopped from an
/// `atexit` hook once it has been started.
pub struct EmbeddedServer {
    process: Mutex<Option<ServerProcess>>,
    running: AtomicBool,
    base_url: RwLock<Option<String>>,
    exit_hook: bool,
}

impl EmbeddedServer {
    /// A standalone supervisor. Its server is stopped when it is dropped.
    pub fn new() -> Self {
        Self {
            process: Mutex::new(None),
            running: AtomicBool::new(false),
            base_url: RwLock::new(None),
            exit_hook: false,
        }
    }

    /// The process-wide supervisor.
    pub fn global() -> &'static EmbeddedServer {
        GLOBAL.get_or_init(|| Self {
            process: Mutex::new(None),
            running: AtomicBool::new(false),
            base_url: RwLock::new(None),
            exit_hook: true,
        })
    }

    /// Start the server unless it is already running and return its base URL.
    ///
    /// Concurrent callers observe exactly one launch.
    pub fn start(&self, config: &EmbeddedConfig) -> Result<String> {
        if self.running.load(Ordering::Acquire) {
            if let Some(url) = self.base_url() {
                return Ok(url);
            }
        }

        let mut guard = self.process.lock();
        if let Some(process) = guard.as_ref() {
            return Ok(process.base_url.clone());
        }

        let process = ServerProcess::launch(config)?;
        let base_url = process.base_url.clone();
        tracing::info!(
            pid = process.child.id(),
            scope = %process.scope,
            base_url = %base_url,
            "Embedded server started"
        );

        *self.base_url.write() = Some(base_url.clone());
        *guard = Some(process);
        self.running.store(true, Ordering::Release);
        drop(guard);

        if self.exit_hook {
            register_exit_hook();
        }
        Ok(base_url)
    }

    /// Stop the server if it is running.
    ///
    /// Sends SIGTERM and waits up to the configured stop timeout. A server that
    /// outlives it is killed along with its process group and
    /// [`Error::Timeout`] is returned. Calling this again is a no-op.
    pub fn stop(&self) -> Result<()> {
        self.stop_with(Logging::Enabled)
    }

    fn stop_with(&self, logging: Logging) -> Result<()> {
        let mut guard = self.process.lock();
        let Some(process) = guard.take() else {
            return Ok(());
        };
        self.running.store(false, Ordering::Release);

        let result = process.shutdown(logging);
        *self.base_url.write() = None;
        result
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Base URL of the running server.
    pub fn base_url(&self) -> Option<String> {
        self.base_url.read().clone()
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.lock().as_ref().map(|p| p.child.id())
    }

    /// Scope label handed to the running server.
    pub fn scope(&self) -> Option<String> {
        self.process.lock().as_ref().map(|p| p.scope.clone())
    }
}

impl Default for EmbeddedServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EmbeddedServer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "Failed to stop embedded server");
        }
    }
}

fn register_exit_hook() {
    EXIT_HOOK.call_once(|| {
        if unsafe { libc::atexit(stop_global_at_exit) } != 0 {
            tracing::warn!("Failed to register exit hook; the embedded server may outlive this process");
        }
    });
}

// Runs after the main thread's thread-locals are destroyed, so nothing on this
// path may touch `tracing` (subscribers buffer in thread-locals).
extern "C" fn stop_global_at_exit() {
    let _ = std::panic::catch_unwind(|| {
        if let Some(server) = GLOBAL.get() {
            let _ = server.stop_with(Logging::Disabled);
        }
    });
}

/// Whether the shutdown path may emit `tracing` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Logging {
    Enabled,
    Disabled,
}

impl Logging {
    fn enabled(self) -> bool {
        self == Logging::Enabled
    }
}

// =============================================================================
// Server Process
// =============================================================================

struct ServerProcess {
    child: Child,
    scope: String,
    base_url: String,
    stdout_pump: Option<LinePump>,
    stderr_pump: Option<LinePump>,
    stop_timeout: Duration,
    log_join_timeout: Duration,
}

impl ServerProcess {
    fn launch(config: &EmbeddedConfig) -> Result<Self> {
        which::which(&config.container_runtime).map_err(|e| {
            Error::dependency_missing(format!(
                "{} is required to run the embedded server: {}",
                config.container_runtime, e
            ))
        })?;

        let binary = config.resolve_server_binary();
        if !binary.is_file() {
            return Err(Error::BinaryMissing(binary));
        }

        let scope = uuid::Uuid::new_v4().to_string();
        let child = spawn_server(&binary, &scope, config.default_image.as_deref())?;
        tracing::debug!(pid = child.id(), binary = %binary.display(), "Spawned embedded server");

        let mut process = Self {
            child,
            scope,
            base_url: String::new(),
            stdout_pump: None,
            stderr_pump: None,
            stop_timeout: config.stop_timeout(),
            log_join_timeout: config.log_join_timeout(),
        };

        match process.handshake(config.handshake_timeout()) {
            Ok(base_url) => {
                process.base_url = base_url;
                Ok(process)
            }
            Err(e) => {
                if let Err(stop_err) = process.shutdown(Logging::Enabled) {
                    tracing::warn!(error = %stop_err, "Failed to stop server after failed start");
                }
                Err(e)
            }
        }
    }

    /// Attach the output pumps and read the server info line.
    fn handshake(&mut self, timeout: Duration) -> Result<String> {
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| Error::launch_failed("server stdout was not captured"))?;
        let stderr = self
            .child
            .stderr
            .take()
            .ok_or_else(|| Error::launch_failed("server stderr was not captured"))?;

        self.stderr_pump = Some(LinePump::spawn("stderr", stderr)?);
        let (tx, rx) = mpsc::sync_channel(1);
        self.stdout_pump = Some(LinePump::spawn_with_first_line("stdout", stdout, tx)?);

        let line = match rx.recv_timeout(timeout) {
            Ok(line) => line,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(
                    match process::wait_with_timeout(&mut self.child, EARLY_EXIT_GRACE)? {
                        Some(status) => Error::launch_failed(format!(
                            "server exited with {} before announcing its address",
                            status
                        )),
                        None => Error::handshake_failed(
                            "server closed stdout before announcing its address",
                        ),
                    },
                );
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some(status) = self.child.try_wait()? {
                    return Err(Error::launch_failed(format!(
                        "server exited with {} before announcing its address",
                        status
                    )));
                }
                return Err(Error::handshake_failed(format!(
                    "no server info received within {:?}",
                    timeout
                )));
            }
        };

        let info: ServerInfo = serde_json::from_str(&line).map_err(|e| {
            Error::handshake_failed(format!("invalid server info {:?}: {}", line, e))
        })?;
        Ok(info.base_url())
    }

    fn shutdown(mut self, logging: Logging) -> Result<()> {
        let pid = self.child.id();
        let log = logging.enabled();
        if log {
            tracing::info!(pid = pid, scope = %self.scope, "Stopping embedded server");
        }

        // Already reaped; the pid may belong to someone else by now.
        if let Ok(Some(status)) = self.child.try_wait() {
            if log {
                tracing::info!(pid = pid, status = %status, "Embedded server already exited");
            }
            self.join_pumps(logging);
            return Ok(());
        }

        if let Err(e) = process::send_signal(&mut self.child, Signal::Term) {
            if log {
                tracing::warn!(pid = pid, error = %e, "Failed to send SIGTERM");
            }
        }

        let result = match process::wait_with_timeout(&mut self.child, self.stop_timeout) {
            Ok(Some(status)) => {
                if log {
                    tracing::info!(pid = pid, status = %status, "Embedded server exited");
                }
                Ok(())
            }
            Ok(None) => {
                if log {
                    tracing::warn!(
                        pid = pid,
                        "Embedded server ignored SIGTERM for {:?}, killing process group",
                        self.stop_timeout
                    );
                }
                self.force_kill(logging);
                Err(Error::timeout(format!(
                    "embedded server (pid {}) did not exit within {:?}",
                    pid, self.stop_timeout
                )))
            }
            Err(e) => {
                self.force_kill(logging);
                Err(e.into())
            }
        };

        self.join_pumps(logging);
        result
    }

    fn join_pumps(&mut self, logging: Logging) {
        for pump in [self.stdout_pump.take(), self.stderr_pump.take()]
            .into_iter()
            .flatten()
        {
            let stream = pump.stream();
            if !pump.join_timeout(self.log_join_timeout) && logging.enabled() {
                tracing::warn!(
                    stream = stream,
                    "Server output reader did not finish in {:?}, detaching",
                    self.log_join_timeout
                );
            }
        }
    }

    fn force_kill(&mut self, logging: Logging) {
        let log = logging.enabled();
        if let Err(e) = process::kill_process_group(&mut self.child) {
            if log {
                tracing::warn!(error = %e, "Failed to kill embedded server process group");
            }
        }
        if let Err(e) = process::wait_with_timeout(&mut self.child, KILL_REAP_TIMEOUT) {
            if log {
                tracing::warn!(error = %e, "Failed to reap embedded server");
            }
        }
    }
}

fn spawn_server(binary: &Path, scope: &str, default_image: Option<&str>) -> Result<Child> {
    let mut cmd = Command::new(binary);
    cmd.env("SANDBOXAID_PORT", "0")
        .env("SANDBOXAID_SCOPE", scope)
        .env("SANDBOXAID_DELETE_ON_SHUTDOWN", "true")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(image) = default_image {
        cmd.env("SANDBOXAID_DEFAULT_IMAGE", image);
    }
    process::detach(&mut cmd);

    cmd.spawn().map_err(|e| {
        Error::launch_failed(format!("failed to spawn {}: {}", binary.display(), e))
    })
}

// =============================================================================
// Tests
// =============================================================================
