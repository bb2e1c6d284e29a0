//! OS-level helpers for the server child process.
//!
//! The server is started in its own session so terminal signals aimed at the
//! host (Ctrl-C in a REPL) do not reach it; shutdown is driven explicitly by
//! the supervisor instead.

use std::io;
use std::process::{Child, ExitStatus};
use std::time::{Duration, Instant};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Signal sent to the server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Term,
    Kill,
}

#[cfg(unix)]
impl Signal {
    fn as_libc_signal(self) -> libc::c_int {
        match self {
            Signal::Term => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        }
    }
}

/// Start a new session. Runs in `pre_exec`.
#[cfg(unix)]
pub fn detach_from_tty() -> io::Result<()> {
    if unsafe { libc::setsid() } == -1 {
        let err = io::Error::last_os_error();
        // Already a session leader; a process group is enough.
        if err.raw_os_error() == Some(libc::EPERM) {
            if unsafe { libc::setpgid(0, 0) } == -1 {
                return Err(io::Error::last_os_error());
            }
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}

/// Configure `cmd` so the child detaches from the controlling terminal.
#[cfg(unix)]
pub fn detach(cmd: &mut std::process::Command) {
    use std::os::unix::process::CommandExt;

    unsafe {
        cmd.pre_exec(detach_from_tty);
    }
}

#[cfg(not(unix))]
pub fn detach(_cmd: &mut std::process::Command) {}

/// Send `signal` to `child`. A process that is already gone is not an error.
#[cfg(unix)]
pub fn send_signal(child: &mut Child, signal: Signal) -> io::Result<()> {
    let pid = child.id() as libc::pid_t;
    if unsafe { libc::kill(pid, signal.as_libc_signal()) } == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn send_signal(child: &mut Child, _signal: Signal) -> io::Result<()> {
    match child.kill() {
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
        other => other,
    }
}

/// SIGKILL the child's whole process group (the child leads it after `setsid`).
#[cfg(unix)]
pub fn kill_process_group(child: &mut Child) -> io::Result<()> {
    let pgid = child.id() as libc::pid_t;
    if unsafe { libc::killpg(pgid, Signal::Kill.as_libc_signal()) } == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn kill_process_group(child: &mut Child) -> io::Result<()> {
    send_signal(child, Signal::Kill)
}

/// Wait up to `timeout` for the child to exit. `Ok(None)` means it is still running.
pub fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        std::thread::sleep(WAIT_POLL_INTERVAL.min(deadline - now));
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    fn sleeper() -> Child {
        let mut cmd = Command::new("sleep");
        cmd.arg("30").stdin(Stdio::null());
        detach(&mut cmd);
        cmd.spawn().unwrap()
    }

    #[test]
    fn test_wait_times_out_on_running_child() {
        let mut child = sleeper();
        let status = wait_with_timeout(&mut child, Duration::from_millis(100)).unwrap();
        assert!(status.is_none());

        kill_process_group(&mut child).unwrap();
        assert!(wait_with_timeout(&mut child, Duration::from_secs(5))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_sigterm_stops_child() {
        let mut child = sleeper();
        send_signal(&mut child, Signal::Term).unwrap();
        let status = wait_with_timeout(&mut child, Duration::from_secs(5))
            .unwrap()
            .expect("child should exit on SIGTERM");
        assert!(!status.success());
    }
}
