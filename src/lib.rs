// Allow uppercase acronyms for industry-standard terms like SATA, SCSI, USB
#![allow(clippy::upper_case_acronyms)]

pub mod config;
pub mod device;
pub mod probe;

#[cfg(test)]
mod config_tests;

// Re-export the main monitoring types for convenience
pub use config::{MonitorConfig, StatusCodeMap};
pub use device::{DriveRecord, DriveRegistry, DriveSnapshot};
pub use probe::{DiagnosticReport, QueryHandle, QueryPoll, Smartctl};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

// Global flag for handling Ctrl+C interrupts
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Set the interrupt flag (called by signal handler)
pub fn set_interrupted() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Check if an interrupt has been received
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Reset the interrupt flag (primarily for testing)
pub fn reset_interrupted() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to launch diagnostic command: {0}")]
    SpawnFailed(String),

    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("no such device registered: {0}")]
    UnknownDevice(String),

    #[error("bad device enumeration pattern: {0}")]
    BadPattern(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type MonitorResult<T> = Result<T, MonitorError>;

/// How the drive is attached, as far as the diagnostic tool can tell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connector {
    Unknown,
    SATA,
    SCSI,
    USB,
    NVMe,
    Other(String),
}

impl Default for Connector {
    fn default() -> Self {
        Connector::Unknown
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connector::Unknown => write!(f, "???"),
            Connector::SATA => write!(f, "SATA"),
            Connector::SCSI => write!(f, "SCSI"),
            Connector::USB => write!(f, "USB"),
            Connector::NVMe => write!(f, "NVMe"),
            Connector::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Lifecycle state of one monitored drive.
///
/// `Wiping` is entered and left only through the explicit wipe signals on
/// `DriveRecord`; it is never inferred from diagnostic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveState {
    Unknown,
    Idle,
    Querying,
    ShortTesting,
    LongTesting,
    /// A self-test is running but the kind was not requested through us.
    Testing,
    Wiping,
}

impl DriveState {
    /// True for every state that denotes an active self-test.
    pub fn is_testing(&self) -> bool {
        matches!(
            self,
            DriveState::ShortTesting | DriveState::LongTesting | DriveState::Testing
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            DriveState::Unknown => "Unknown",
            DriveState::Idle => "Idle",
            DriveState::Querying => "Querying",
            DriveState::ShortTesting => "Short testing",
            DriveState::LongTesting => "Long testing",
            DriveState::Testing => "Testing",
            DriveState::Wiping => "Wiping",
        }
    }
}

impl fmt::Display for DriveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of device self-test requested through the diagnostic tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    Short,
    Long,
}

impl TestKind {
    /// Argument accepted by `smartctl -t`.
    pub fn tool_arg(&self) -> &'static str {
        match self {
            TestKind::Short => "short",
            TestKind::Long => "long",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_arg())
    }
}
