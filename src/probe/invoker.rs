//! Non-blocking invocation of the diagnostic tool.
//!
//! A full scan can take seconds on a busy or sleeping drive, so scans run as
//! detached child processes and the caller polls for completion. The short
//! commands (start test, abort test) finish quickly and run blocking.

use crate::{MonitorError, MonitorResult, TestKind};
use log::debug;
use std::io::Read;
use std::process::{Child, Command, Stdio};

/// Wrapper around the smartctl binary.
#[derive(Debug, Clone)]
pub struct Smartctl {
    binary: String,
}

/// Result of a readiness poll on an in-flight query.
#[derive(Debug, PartialEq, Eq)]
pub enum QueryPoll {
    Pending,
    Ready,
}

/// Handle to one in-flight diagnostic scan.
pub struct QueryHandle {
    child: Child,
    // The stdout pipe may be drained only once; `reaped` guards against a
    // second drain after the child has exited.
    reaped: bool,
    captured: Option<String>,
}

impl Smartctl {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Start a full diagnostic scan (`-a`) without blocking.
    pub fn scan(&self, device_path: &str) -> MonitorResult<QueryHandle> {
        self.spawn_query(&["-a", device_path])
    }

    /// Start a lightweight status-only check (`-c`) without blocking.
    pub fn quick_status(&self, device_path: &str) -> MonitorResult<QueryHandle> {
        self.spawn_query(&["-c", device_path])
    }

    fn spawn_query(&self, args: &[&str]) -> MonitorResult<QueryHandle> {
        debug!("spawning {} {}", self.binary, args.join(" "));
        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            // The tool routinely warns on stderr (non-root, unknown drives);
            // none of it may pollute the captured report or the terminal.
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MonitorError::SpawnFailed(format!("{}: {}", self.binary, e)))?;

        Ok(QueryHandle {
            child,
            reaped: false,
            captured: None,
        })
    }

    /// Ask the drive to begin a self-test (`-t short|long`). Blocking; the
    /// command returns promptly. The captured stdout is handed back because
    /// it carries the "Test will complete after <timestamp>" line.
    pub fn start_test(&self, device_path: &str, kind: TestKind) -> MonitorResult<String> {
        debug!("starting {} test on {}", kind, device_path);
        let output = Command::new(&self.binary)
            .args(["-t", kind.tool_arg(), device_path])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| MonitorError::SpawnFailed(format!("{}: {}", self.binary, e)))?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Ask the drive to abort its running self-test (`-X`). Blocking.
    pub fn abort_test(&self, device_path: &str) -> MonitorResult<()> {
        debug!("aborting self-test on {}", device_path);
        Command::new(&self.binary)
            .args(["-X", device_path])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| MonitorError::SpawnFailed(format!("{}: {}", self.binary, e)))?;
        Ok(())
    }
}

impl QueryHandle {
    /// Non-blocking readiness check. Safe to call repeatedly: while the
    /// child runs this has no side effects, and the first call that
    /// observes the exit drains the stdout pipe exactly once.
    pub fn poll(&mut self) -> MonitorResult<QueryPoll> {
        if self.reaped {
            return Ok(QueryPoll::Ready);
        }

        match self.child.try_wait()? {
            None => Ok(QueryPoll::Pending),
            Some(_status) => {
                let mut raw = String::new();
                if let Some(mut stdout) = self.child.stdout.take() {
                    stdout.read_to_string(&mut raw)?;
                }
                self.captured = Some(raw);
                self.reaped = true;
                Ok(QueryPoll::Ready)
            }
        }
    }

    /// Yield the captured output. Returns `Some` exactly once, after a poll
    /// has reported `Ready`.
    pub fn take_output(&mut self) -> Option<String> {
        self.captured.take()
    }

    /// Best-effort termination of the query process. Only used when the
    /// device itself has been told to abort a self-test; a plain query is
    /// expected to finish on its own.
    pub fn abort(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.reaped = true;
        self.captured = None;
    }
}
