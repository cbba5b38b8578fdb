//! Device registry: enumeration, record lifecycle, refresh/poll cycles.
//!
//! The registry owns every `DriveRecord` exclusively. All work happens on
//! the caller's polling thread; nothing here blocks on a drive.

use crate::config::MonitorConfig;
use crate::device::drive::DriveRecord;
use crate::probe::Smartctl;
use crate::{DriveState, MonitorError, MonitorResult, TestKind};
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};

pub struct DriveRegistry {
    config: MonitorConfig,
    tool: Smartctl,
    drives: BTreeMap<String, DriveRecord>,
}

impl DriveRegistry {
    pub fn new(config: MonitorConfig) -> Self {
        let tool = Smartctl::new(config.smartctl_path.clone());
        Self {
            config,
            tool,
            drives: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.drives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drives.is_empty()
    }

    pub fn drives(&self) -> impl Iterator<Item = &DriveRecord> {
        self.drives.values()
    }

    pub fn get(&self, path: &str) -> Option<&DriveRecord> {
        self.drives.get(path)
    }

    /// True while any drive has a query in flight.
    pub fn query_pending(&self) -> bool {
        self.drives.values().any(|d| d.query_pending())
    }

    /// Candidate device paths: the configured explicit list, or the glob
    /// pattern when no list is given.
    pub fn enumerate_paths(&self) -> MonitorResult<Vec<String>> {
        if !self.config.device_paths.is_empty() {
            return Ok(self.config.device_paths.clone());
        }

        let pattern = &self.config.device_pattern;
        let entries = glob::glob(pattern)
            .map_err(|e| MonitorError::BadPattern(format!("{}: {}", pattern, e)))?;

        let mut found = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => found.push(path.to_string_lossy().into_owned()),
                Err(e) => warn!("skipping unreadable enumeration entry: {}", e),
            }
        }
        Ok(found)
    }

    /// One refresh cycle: re-enumerate, create records for new paths, drop
    /// records whose path vanished, and start a query for every record that
    /// has no query in flight and is not being wiped. Spawn failures are
    /// per-device: the drive keeps its last-known state and is retried on
    /// the next cycle.
    pub fn refresh_all(&mut self) -> Vec<(String, MonitorError)> {
        let mut failures = Vec::new();

        let found = match self.enumerate_paths() {
            Ok(found) => found,
            Err(e) => {
                warn!("device enumeration failed: {}", e);
                failures.push((self.config.device_pattern.clone(), e));
                return failures;
            }
        };

        // A full enumeration is the only thing that retires a record.
        let keep: BTreeSet<&String> = found.iter().collect();
        self.drives.retain(|path, _| {
            if keep.contains(path) {
                true
            } else {
                info!("drive {} no longer enumerated, dropping", path);
                false
            }
        });

        for path in found {
            let record = self
                .drives
                .entry(path.clone())
                .or_insert_with(|| {
                    info!("discovered drive {}", path);
                    DriveRecord::new(path.clone())
                });

            // Never overlap queries for one device; a wiping drive belongs
            // to the external wipe tool until its end signal.
            if record.query_pending() || record.state() == DriveState::Wiping {
                continue;
            }

            if let Err(e) = record.begin_query(&self.tool) {
                warn!("failed to query {}: {}", path, e);
                failures.push((path, e));
            }
        }

        failures
    }

    /// Advance every pending query by one non-blocking poll. Completed
    /// output flows through the parser into the state machine. Returns the
    /// paths whose reports were consumed this tick.
    pub fn poll_all(&mut self) -> Vec<String> {
        let codes = self.config.status_codes.clone();
        let mut completed = Vec::new();

        for (path, record) in self.drives.iter_mut() {
            match record.poll_query(&codes) {
                Ok(true) => completed.push(path.clone()),
                Ok(false) => {}
                Err(e) => warn!("query for {} failed: {}", path, e),
            }
        }

        completed
    }

    pub fn run_short_test(&mut self, path: &str) -> MonitorResult<()> {
        let tool = self.tool.clone();
        self.record_mut(path)?.run_test(&tool, TestKind::Short)
    }

    pub fn run_long_test(&mut self, path: &str) -> MonitorResult<()> {
        let tool = self.tool.clone();
        self.record_mut(path)?.run_test(&tool, TestKind::Long)
    }

    pub fn abort_test(&mut self, path: &str) -> MonitorResult<()> {
        let tool = self.tool.clone();
        self.record_mut(path)?.abort_test(&tool)
    }

    pub fn begin_wipe(&mut self, path: &str) -> MonitorResult<()> {
        self.record_mut(path)?.begin_wipe()
    }

    pub fn end_wipe(&mut self, path: &str) -> MonitorResult<()> {
        self.record_mut(path)?.end_wipe()
    }

    fn record_mut(&mut self, path: &str) -> MonitorResult<&mut DriveRecord> {
        self.drives
            .get_mut(path)
            .ok_or_else(|| MonitorError::UnknownDevice(path.to_string()))
    }
}
