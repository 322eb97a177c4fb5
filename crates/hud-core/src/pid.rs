//! Worker process identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// PID of the upstream worker process.
///
/// Always positive and representable as a signed 32-bit `pid_t`, so it can
/// never address a process group (`0` or negative values to `kill(2)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct WorkerPid(u32);

impl WorkerPid {
    /// Validates a raw PID.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidFieldValue` for `0` or values above `i32::MAX`.
    pub fn new(raw: u32) -> DomainResult<Self> {
        if raw == 0 || i32::try_from(raw).is_err() {
            return Err(DomainError::InvalidFieldValue {
                field: "pid".to_string(),
                value: raw.to_string(),
                expected: "a positive process id".to_string(),
            });
        }
        Ok(Self(raw))
    }

    /// Returns the PID as an unsigned integer.
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Returns the PID as a `pid_t` for signal delivery.
    pub fn as_raw(&self) -> i32 {
        // Range checked in `new`
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }
}

impl TryFrom<u32> for WorkerPid {
    type Error = DomainError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<WorkerPid> for u32 {
    fn from(pid: WorkerPid) -> Self {
        pid.0
    }
}

impl FromStr for WorkerPid {
    type Err = DomainError;

    /// Parses a PID, ignoring surrounding whitespace (pidfiles end in `\n`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let raw: u32 = trimmed.parse().map_err(|_| DomainError::InvalidFieldValue {
            field: "pid".to_string(),
            value: trimmed.to_string(),
            expected: "a positive process id".to_string(),
        })?;
        Self::new(raw)
    }
}

impl fmt::Display for WorkerPid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
