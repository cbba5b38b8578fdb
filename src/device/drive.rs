//! Per-device record and state machine.
//!
//! A `DriveRecord` is owned by the registry for the lifetime of its device
//! path. All mutation happens on the polling thread: queries are merged in
//! through `apply_report`, test commands go out through the record so the
//! state machine can reject requests that conflict with what the drive is
//! already doing.

use crate::config::StatusCodeMap;
use crate::device::summary::SummaryRow;
use crate::probe::attribute::{
    Attribute, AttributeTable, ATTR_GSENSE, ATTR_GSENSE_ALT, ATTR_POWER_ON_HOURS,
    ATTR_REALLOCATED,
};
use crate::probe::{eta, DiagnosticReport, QueryHandle, QueryPoll, Smartctl};
use crate::{Connector, DriveState, MonitorError, MonitorResult, TestKind};
use chrono::{DateTime, Local};
use log::debug;
use serde::Serialize;
use std::collections::BTreeSet;

// Test results that do not indicate a device problem.
const HARMLESS_TEST_RESULTS: [&str; 4] = [
    "Completed without error",
    "Aborted by host",
    "Self-test routine in progress",
    "Interrupted (host reset)",
];

pub struct DriveRecord {
    path: String,
    serial: Option<String>,
    model: Option<String>,
    capacity: Option<String>,
    connector: Connector,
    solid_state: Option<bool>,
    reallocated_sectors: Option<u64>,
    power_on_hours: Option<u64>,
    attributes: AttributeTable,
    failed_attribute_ids: BTreeSet<u8>,
    test_history_header: Option<String>,
    test_history: Vec<String>,
    state: DriveState,
    status_code: Option<u8>,
    status_description: Option<String>,
    test_progress: Option<u8>,
    estimated_completion: Option<DateTime<Local>>,
    last_test_aborted: bool,
    pending_query: Option<QueryHandle>,
}

/// Read-only view of a record for display layers. Plain data, serializable.
#[derive(Debug, Clone, Serialize)]
pub struct DriveSnapshot {
    pub path: String,
    pub serial: Option<String>,
    pub model: Option<String>,
    pub capacity: Option<String>,
    pub connector: Connector,
    pub solid_state: Option<bool>,
    pub reallocated_sectors: Option<u64>,
    pub power_on_hours: Option<u64>,
    pub attributes: Vec<Attribute>,
    pub failed_attribute_ids: Vec<u8>,
    pub test_history_header: Option<String>,
    pub test_history: Vec<String>,
    pub state: DriveState,
    pub status_code: Option<u8>,
    pub status_description: Option<String>,
    pub test_progress: Option<u8>,
    pub estimated_completion: Option<DateTime<Local>>,
    pub last_test_aborted: bool,
}

impl DriveRecord {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            serial: None,
            model: None,
            capacity: None,
            connector: Connector::Unknown,
            solid_state: None,
            reallocated_sectors: None,
            power_on_hours: None,
            attributes: AttributeTable::new(),
            failed_attribute_ids: BTreeSet::new(),
            test_history_header: None,
            test_history: Vec::new(),
            state: DriveState::Unknown,
            status_code: None,
            status_description: None,
            test_progress: None,
            estimated_completion: None,
            last_test_aborted: false,
            pending_query: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn capacity(&self) -> Option<&str> {
        self.capacity.as_deref()
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    pub fn solid_state(&self) -> Option<bool> {
        self.solid_state
    }

    pub fn reallocated_sectors(&self) -> Option<u64> {
        self.reallocated_sectors
    }

    pub fn power_on_hours(&self) -> Option<u64> {
        self.power_on_hours
    }

    pub fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    pub fn failed_attribute_ids(&self) -> &BTreeSet<u8> {
        &self.failed_attribute_ids
    }

    pub fn test_history(&self) -> &[String] {
        &self.test_history
    }

    pub fn test_history_header(&self) -> Option<&str> {
        self.test_history_header.as_deref()
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    pub fn status_code(&self) -> Option<u8> {
        self.status_code
    }

    pub fn status_description(&self) -> Option<&str> {
        self.status_description.as_deref()
    }

    pub fn test_progress(&self) -> Option<u8> {
        self.test_progress
    }

    pub fn estimated_completion(&self) -> Option<DateTime<Local>> {
        self.estimated_completion
    }

    pub fn last_test_aborted(&self) -> bool {
        self.last_test_aborted
    }

    pub fn query_pending(&self) -> bool {
        self.pending_query.is_some()
    }

    /// Launch a new diagnostic query for this drive. Rejected while another
    /// query is in flight: for a given device the query started at tick N
    /// must be the one consumed when it completes, never overlapped.
    pub(crate) fn begin_query(&mut self, tool: &Smartctl) -> MonitorResult<()> {
        if self.pending_query.is_some() {
            return Err(MonitorError::InvalidTransition(format!(
                "{}: a diagnostic query is already in flight",
                self.path
            )));
        }

        let handle = tool.scan(&self.path)?;
        self.pending_query = Some(handle);
        // A drive mid-test or mid-wipe keeps its visible state while the
        // query runs; that is what carries an explicit short/long request
        // across refresh cycles.
        if !self.state.is_testing() && self.state != DriveState::Wiping {
            self.state = DriveState::Querying;
        }
        Ok(())
    }

    /// Advance a pending query without blocking. Returns true when output
    /// was consumed this tick.
    pub(crate) fn poll_query(&mut self, codes: &StatusCodeMap) -> MonitorResult<bool> {
        let handle = match self.pending_query.as_mut() {
            Some(handle) => handle,
            None => return Ok(false),
        };

        match handle.poll() {
            Ok(QueryPoll::Pending) => Ok(false),
            Ok(QueryPoll::Ready) => {
                let raw = handle.take_output().unwrap_or_default();
                self.pending_query = None;
                debug!("query for {} completed ({} bytes)", self.path, raw.len());
                let report = DiagnosticReport::parse(&raw);
                self.apply_report(report, codes);
                Ok(true)
            }
            Err(e) => {
                // Reap failure: drop the query, keep last-known fields, and
                // let the next refresh cycle retry.
                self.pending_query = None;
                if self.state == DriveState::Querying {
                    self.state = DriveState::Unknown;
                }
                Err(e)
            }
        }
    }

    /// Merge one diagnostic report into the record and reclassify state.
    pub(crate) fn apply_report(&mut self, report: DiagnosticReport, codes: &StatusCodeMap) {
        // Receipt of a report ends the querying phase; classification below
        // settles the final state within this same update step.
        if self.state == DriveState::Querying {
            self.state = DriveState::Unknown;
        }

        self.status_code = report.status_code;
        self.status_description = report.status_description;

        if report.unrecognized_bridge {
            // The tool saw only the enclosure. Record the connector and
            // leave every other field at its last known value.
            self.connector = Connector::USB;
            self.clear_test_tracking_unless_active();
            return;
        }

        if let Some(serial) = report.serial {
            self.serial = Some(serial);
        }
        if let Some(model) = report.model {
            self.model = Some(model);
        }
        if let Some(capacity) = report.capacity {
            self.capacity = Some(capacity);
        }
        if let Some(connector) = report.connector {
            self.connector = connector;
        }
        if let Some(solid_state) = report.solid_state {
            self.solid_state = Some(solid_state);
        }

        if !report.attributes.is_empty() {
            self.attributes = report.attributes;
        }
        self.failed_attribute_ids = self.attributes.failed_ids();
        if let Some(count) = self
            .attributes
            .get(ATTR_REALLOCATED)
            .and_then(Attribute::raw_number)
        {
            self.reallocated_sectors = Some(count);
        }
        if let Some(hours) = self
            .attributes
            .get(ATTR_POWER_ON_HOURS)
            .and_then(Attribute::raw_number)
        {
            self.power_on_hours = Some(hours);
        }

        // The tool reports the full self-test log every time, so history is
        // replaced wholesale, never appended.
        if report.test_log_header.is_some() || !report.test_log.is_empty() {
            self.test_history_header = report.test_log_header;
            self.test_history = report.test_log;
        }

        // Only the explicit wipe signals move a wiping drive.
        if self.state != DriveState::Wiping {
            let was = self.state;
            self.state = match report.status_code {
                None => DriveState::Idle,
                Some(code) if codes.is_idle(code) => DriveState::Idle,
                Some(code) if codes.is_active(code) => {
                    self.test_progress = codes.completion_percent(code);
                    // An explicit short/long request takes precedence over
                    // the undifferentiated active-test code.
                    if matches!(was, DriveState::ShortTesting | DriveState::LongTesting) {
                        was
                    } else {
                        DriveState::Testing
                    }
                }
                Some(_) => DriveState::Unknown,
            };
        }

        self.clear_test_tracking_unless_active();
    }

    /// Ask the drive to run a self-test. Only an idle-ish drive may start
    /// one: an active test, a wipe, or an unfinished query all reject the
    /// request and leave state untouched.
    pub(crate) fn run_test(&mut self, tool: &Smartctl, kind: TestKind) -> MonitorResult<()> {
        if self.state.is_testing() {
            return Err(MonitorError::InvalidTransition(format!(
                "{}: a self-test is already running",
                self.path
            )));
        }
        if self.state == DriveState::Wiping {
            return Err(MonitorError::InvalidTransition(format!(
                "{}: drive is being wiped",
                self.path
            )));
        }
        if self.pending_query.is_some() {
            return Err(MonitorError::InvalidTransition(format!(
                "{}: a diagnostic query is still in flight",
                self.path
            )));
        }

        let output = tool.start_test(&self.path, kind)?;
        self.estimated_completion = eta::parse_completion_time(&output);
        self.test_progress = Some(0);
        self.last_test_aborted = false;
        self.state = match kind {
            TestKind::Short => DriveState::ShortTesting,
            TestKind::Long => DriveState::LongTesting,
        };

        // Re-query immediately so the new status is observed promptly.
        self.begin_query(tool)
    }

    /// Ask the drive to abort its running self-test, from any state.
    pub(crate) fn abort_test(&mut self, tool: &Smartctl) -> MonitorResult<()> {
        tool.abort_test(&self.path)?;

        if let Some(mut query) = self.pending_query.take() {
            query.abort();
        }

        self.state = DriveState::Unknown;
        self.test_progress = None;
        self.estimated_completion = None;
        self.last_test_aborted = true;

        self.begin_query(tool)
    }

    /// External signal: a wipe tool has taken the device. The record stops
    /// being refreshed until `end_wipe`.
    pub fn begin_wipe(&mut self) -> MonitorResult<()> {
        if self.state.is_testing() {
            return Err(MonitorError::InvalidTransition(format!(
                "{}: abort the running self-test before wiping",
                self.path
            )));
        }
        self.state = DriveState::Wiping;
        self.test_progress = None;
        self.estimated_completion = None;
        Ok(())
    }

    /// External signal: the wipe is over; the next refresh re-discovers the
    /// device's status.
    pub fn end_wipe(&mut self) -> MonitorResult<()> {
        if self.state != DriveState::Wiping {
            return Err(MonitorError::InvalidTransition(format!(
                "{}: not being wiped",
                self.path
            )));
        }
        self.state = DriveState::Unknown;
        Ok(())
    }

    fn clear_test_tracking_unless_active(&mut self) {
        if !self.state.is_testing() {
            self.test_progress = None;
            self.estimated_completion = None;
        }
    }

    pub fn has_failed_attributes(&self) -> bool {
        !self.failed_attribute_ids.is_empty()
    }

    /// True when any historical test result is something other than the
    /// harmless completed/aborted/interrupted/in-progress messages.
    pub fn has_failure_history(&self) -> bool {
        self.test_history
            .iter()
            .any(|line| !HARMLESS_TEST_RESULTS.iter().any(|msg| line.contains(msg)))
    }

    /// Case-insensitive substring match across the fields an operator can
    /// see or scan: path, serial, model.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.path.to_lowercase().contains(&needle)
            || self
                .serial
                .as_deref()
                .map_or(false, |s| s.to_lowercase().contains(&needle))
            || self
                .model
                .as_deref()
                .map_or(false, |m| m.to_lowercase().contains(&needle))
    }

    /// Human-readable state, with completion and remaining time while a
    /// test is active.
    pub fn status_string(&self) -> String {
        if self.state.is_testing() {
            if let Some(percent) = self.test_progress {
                if let Some(completion) = self.estimated_completion {
                    let left = eta::time_remaining(completion, Local::now());
                    if left > chrono::Duration::zero() {
                        return format!(
                            "{} {}% ({} left)",
                            self.state.label(),
                            percent,
                            eta::format_remaining(left)
                        );
                    }
                }
                return format!("{} {}%", self.state.label(), percent);
            }
        }
        self.state.label().to_string()
    }

    /// Plain fixed-width fields for one table row. Degraded fields render
    /// as `???`; color belongs to the display layer.
    pub fn summary_row(&self) -> SummaryRow {
        let unknown = || "???".to_string();
        SummaryRow {
            path: self.path.clone(),
            connector: self.connector.to_string(),
            kind: match self.solid_state {
                Some(true) => "SSD".to_string(),
                Some(false) => "HDD".to_string(),
                None => unknown(),
            },
            capacity: self.capacity.clone().unwrap_or_else(unknown),
            model: self.model.clone().unwrap_or_else(unknown),
            serial: self.serial.clone().unwrap_or_else(unknown),
            reallocated: self
                .reallocated_sectors
                .map(|n| n.to_string())
                .unwrap_or_else(unknown),
            hours: self
                .power_on_hours
                .map(|n| n.to_string())
                .unwrap_or_else(unknown),
            gsense: self
                .attributes
                .get(ATTR_GSENSE)
                .or_else(|| self.attributes.get(ATTR_GSENSE_ALT))
                .and_then(Attribute::raw_number)
                .map(|n| n.to_string())
                .unwrap_or_else(unknown),
            when_failed: if self.has_failed_attributes() {
                "see below".to_string()
            } else {
                "-".to_string()
            },
            test_state: self.status_string(),
        }
    }

    pub fn snapshot(&self) -> DriveSnapshot {
        DriveSnapshot {
            path: self.path.clone(),
            serial: self.serial.clone(),
            model: self.model.clone(),
            capacity: self.capacity.clone(),
            connector: self.connector.clone(),
            solid_state: self.solid_state,
            reallocated_sectors: self.reallocated_sectors,
            power_on_hours: self.power_on_hours,
            attributes: self.attributes.iter().cloned().collect(),
            failed_attribute_ids: self.failed_attribute_ids.iter().copied().collect(),
            test_history_header: self.test_history_header.clone(),
            test_history: self.test_history.clone(),
            state: self.state,
            status_code: self.status_code,
            status_description: self.status_description.clone(),
            test_progress: self.test_progress,
            estimated_completion: self.estimated_completion,
            last_test_aborted: self.last_test_aborted,
        }
    }
}
