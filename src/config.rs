//! Monitor configuration.
//!
//! The self-test execution status codes reported by the diagnostic tool are
//! ambiguous across tool revisions, so the idle/aborted/interrupted sets and
//! the active-test range are configuration data with defaults taken from the
//! smartctl manual for ATA devices, not hardcoded assumptions.

use crate::{MonitorError, MonitorResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Diagnostic tool binary, resolved through PATH unless absolute.
    pub smartctl_path: String,

    /// Glob used to enumerate candidate devices when no explicit list is given.
    pub device_pattern: String,

    /// Explicit device paths; when non-empty this overrides `device_pattern`.
    pub device_paths: Vec<String>,

    /// Seconds between full refresh cycles in the monitor loop.
    pub refresh_interval_secs: u64,

    pub status_codes: StatusCodeMap,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            smartctl_path: "smartctl".to_string(),
            device_pattern: "/dev/sd?".to_string(),
            device_paths: Vec::new(),
            refresh_interval_secs: 30,
            status_codes: StatusCodeMap::default(),
        }
    }
}

impl MonitorConfig {
    /// Layered load: defaults, then an optional config file, then
    /// `DRIVEWATCH_*` environment overrides.
    pub fn load(file: Option<&str>) -> MonitorResult<Self> {
        let defaults = config::Config::try_from(&MonitorConfig::default())
            .map_err(|e| MonitorError::Config(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder
            .add_source(config::Environment::with_prefix("DRIVEWATCH").separator("__"))
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| MonitorError::Config(e.to_string()))
    }
}

/// Classification of the tool's self-test execution status byte.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusCodeMap {
    /// Drive is idle, no test has been interrupted.
    pub idle: Vec<u8>,

    /// Drive is idle and the most recent test was aborted by the host.
    pub aborted: Vec<u8>,

    /// Drive is idle and the most recent test was interrupted (host reset).
    pub interrupted: Vec<u8>,

    /// Highest code denoting a test in progress.
    pub active_max: u8,

    /// Number of codes in the active-test range, counting down from
    /// `active_max`.
    pub active_count: u8,
}

impl Default for StatusCodeMap {
    fn default() -> Self {
        Self {
            idle: vec![0],
            aborted: vec![16, 24, 25],
            interrupted: vec![32, 33],
            active_max: 249,
            active_count: 10,
        }
    }
}

impl StatusCodeMap {
    /// Lowest code in the active-test range.
    pub fn active_min(&self) -> u8 {
        self.active_max.saturating_sub(self.active_count.saturating_sub(1))
    }

    /// True when the code means the drive is sitting idle, whether the last
    /// test completed, was aborted, or was interrupted.
    pub fn is_idle(&self, code: u8) -> bool {
        self.idle.contains(&code)
            || self.aborted.contains(&code)
            || self.interrupted.contains(&code)
    }

    /// True when the code denotes a self-test in progress.
    pub fn is_active(&self, code: u8) -> bool {
        code >= self.active_min() && code <= self.active_max
    }

    /// Completion percentage for an active-test code: the code counts down
    /// toward `active_max` as the test progresses, so completion is a linear
    /// function of its distance from the top of the range.
    pub fn completion_percent(&self, code: u8) -> Option<u8> {
        if !self.is_active(code) {
            return None;
        }
        let percent = (u16::from(self.active_max) + 1 - u16::from(code)) * 10;
        Some(percent.min(100) as u8)
    }
}
