//! Pause/resume of the worker process.
//!
//! Pause delivers `SIGSTOP`, resume delivers `SIGCONT`, to whatever PID
//! discovery currently holds. With no PID resolved, nothing is signalled.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use hud_core::WorkerPid;

use crate::discovery::PidWatch;

/// Errors from a control request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// Discovery has not resolved a worker PID yet.
    #[error("worker PID not found (set HORNET_PID or HORNET_PIDFILE, or ensure the process name contains the marker)")]
    NoTargetProcess,

    /// The PID no longer names a live process.
    #[error("process {pid} not found")]
    TargetNotFound { pid: WorkerPid },

    /// The relay may not signal that process.
    #[error("permission denied signalling process {pid}")]
    PermissionDenied { pid: WorkerPid },

    /// Any other signal delivery failure.
    #[error("failed to signal process {pid}: {message}")]
    Signal { pid: WorkerPid, message: String },
}

/// The two control actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// `SIGSTOP`
    Pause,
    /// `SIGCONT`
    Resume,
}

impl ControlSignal {
    /// Returns the signal name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pause => "SIGSTOP",
            Self::Resume => "SIGCONT",
        }
    }

    #[cfg(unix)]
    fn as_raw(&self) -> libc::c_int {
        match self {
            Self::Pause => libc::SIGSTOP,
            Self::Resume => libc::SIGCONT,
        }
    }
}

/// Delivers a control signal to a process.
pub trait Signaller: Send + Sync {
    /// Sends `signal` to `pid`.
    ///
    /// # Errors
    ///
    /// Returns the OS error from the delivery attempt.
    fn deliver(&self, pid: WorkerPid, signal: ControlSignal) -> io::Result<()>;
}

/// Signals real processes with `kill(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KillSignaller;

impl Signaller for KillSignaller {
    #[cfg(unix)]
    fn deliver(&self, pid: WorkerPid, signal: ControlSignal) -> io::Result<()> {
        // SAFETY: kill has no memory-safety preconditions; WorkerPid is always
        // a positive pid_t, so this never targets a process group
        let rc = unsafe { libc::kill(pid.as_raw(), signal.as_raw()) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn deliver(&self, _pid: WorkerPid, _signal: ControlSignal) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process signals are not supported on this platform",
        ))
    }
}

/// Pause/resume front end shared by the HTTP handlers.
#[derive(Clone)]
pub struct ProcessControl {
    pid: PidWatch,
    signaller: Arc<dyn Signaller>,
}

impl ProcessControl {
    /// Creates a controller that signals with `kill(2)`.
    pub fn new(pid: PidWatch) -> Self {
        Self::with_signaller(pid, Arc::new(KillSignaller))
    }

    /// Creates a controller with a custom signaller.
    pub fn with_signaller(pid: PidWatch, signaller: Arc<dyn Signaller>) -> Self {
        Self { pid, signaller }
    }

    /// Returns the currently resolved worker PID.
    pub fn current_pid(&self) -> Option<WorkerPid> {
        *self.pid.borrow()
    }

    /// Stops the worker.
    ///
    /// # Errors
    ///
    /// See [`ControlError`].
    pub fn pause(&self) -> Result<WorkerPid, ControlError> {
        self.send(ControlSignal::Pause)
    }

    /// Continues the worker.
    ///
    /// # Errors
    ///
    /// See [`ControlError`].
    pub fn resume(&self) -> Result<WorkerPid, ControlError> {
        self.send(ControlSignal::Resume)
    }

    fn send(&self, signal: ControlSignal) -> Result<WorkerPid, ControlError> {
        let pid = self.current_pid().ok_or(ControlError::NoTargetProcess)?;

        match self.signaller.deliver(pid, signal) {
            Ok(()) => {
                info!(pid = %pid, signal = signal.as_str(), "Signal delivered");
                Ok(pid)
            }
            Err(e) => {
                let err = classify_signal_error(pid, &e);
                warn!(pid = %pid, signal = signal.as_str(), error = %err, "Signal delivery failed");
                Err(err)
            }
        }
    }
}

fn classify_signal_error(pid: WorkerPid, error: &io::Error) -> ControlError {
    #[cfg(unix)]
    {
        if error.raw_os_error() == Some(libc::ESRCH) {
            return ControlError::TargetNotFound { pid };
        }
    }

    match error.kind() {
        io::ErrorKind::NotFound => ControlError::TargetNotFound { pid },
        io::ErrorKind::PermissionDenied => ControlError::PermissionDenied { pid },
        _ => ControlError::Signal {
            pid,
            message: error.to_string(),
        },
    }
}
