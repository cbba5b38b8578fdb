//! Interpretation of raw diagnostic output.
//!
//! Parsing never fails: every field degrades independently to its unknown
//! sentinel when its pattern is not found, so one mangled section can never
//! hide the rest of the report.

use super::attribute::{self, Attribute, AttributeTable};
use crate::Connector;
use lazy_static::lazy_static;
use regex::Regex;

/// Section header that opens the vendor attribute table.
pub const ATTRIBUTE_SECTION: &str = "Vendor Specific SMART Attributes with Thresholds:";

/// Marker line that opens the self-test history log.
pub const SELFTEST_LOG_MARKER: &str = "SMART Self-test log structure";

/// Emitted when the device sits behind a bridge adapter the tool cannot
/// talk through.
pub const UNKNOWN_BRIDGE_MARKER: &str = "Unknown USB bridge";

lazy_static! {
    static ref SERIAL: Regex = Regex::new(r"(?m)^Serial Number:\s*(.+)$").unwrap();
    static ref MODEL: Regex = Regex::new(r"(?m)^Device Model:\s*(.+)$").unwrap();
    static ref MODEL_NUMBER: Regex = Regex::new(r"(?m)^Model Number:\s*(.+)$").unwrap();
    static ref CAPACITY: Regex = Regex::new(r"(?m)^User Capacity:.*\[(.+)\]").unwrap();
    static ref STATUS_CODE: Regex =
        Regex::new(r"Self-test execution status:\s*\(\s*(\d+)\s*\)").unwrap();
    static ref STATUS_DESC: Regex =
        Regex::new(r"Self-test execution status:\s*\(\s*\d+\s*\)\s*(.*)").unwrap();
    static ref ROTATION: Regex = Regex::new(r"(?m)^Rotation Rate:\s*(.+)$").unwrap();
    static ref TRANSPORT: Regex = Regex::new(r"(?m)^Transport protocol:\s*(\S+)").unwrap();
}

/// Structured form of one full diagnostic scan. Transient: produced by the
/// parser, merged into a `DriveRecord` once, then discarded.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticReport {
    /// Device sits behind an unrecognized bridge adapter; nothing besides
    /// the connector classification could be read.
    pub unrecognized_bridge: bool,
    pub serial: Option<String>,
    pub model: Option<String>,
    pub capacity: Option<String>,
    pub connector: Option<Connector>,
    pub solid_state: Option<bool>,
    /// Raw self-test execution status code. Absent is distinct from a
    /// present-but-idle code.
    pub status_code: Option<u8>,
    /// Status description normalized to a single line.
    pub status_description: Option<String>,
    pub test_log_header: Option<String>,
    /// Self-test history rows, tool-reported order (most recent first).
    pub test_log: Vec<String>,
    pub attributes: AttributeTable,
}

impl DiagnosticReport {
    pub fn parse(raw: &str) -> DiagnosticReport {
        let mut report = DiagnosticReport::default();

        if raw.contains(UNKNOWN_BRIDGE_MARKER) {
            // The tool cannot see through the enclosure; the rest of the
            // output carries nothing about the drive itself.
            report.unrecognized_bridge = true;
            report.connector = Some(Connector::USB);
            return report;
        }

        report.serial = capture(&SERIAL, raw);
        report.model = capture(&MODEL, raw).or_else(|| capture(&MODEL_NUMBER, raw));
        report.capacity = capture(&CAPACITY, raw);
        report.connector = detect_connector(raw);
        report.solid_state = detect_rotation(raw);
        report.status_code = capture(&STATUS_CODE, raw).and_then(|c| c.parse().ok());

        let lines: Vec<&str> = raw.lines().collect();
        report.status_description = extract_status_description(&lines);
        extract_test_log(&lines, &mut report);
        extract_attributes(&lines, &mut report.attributes);

        report
    }

    /// Ids whose failure marker is active.
    pub fn failed_attribute_ids(&self) -> std::collections::BTreeSet<u8> {
        self.attributes.failed_ids()
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn detect_connector(raw: &str) -> Option<Connector> {
    if raw.contains("SATA Version is:") {
        return Some(Connector::SATA);
    }
    if raw.contains("NVMe Version:") {
        return Some(Connector::NVMe);
    }
    if let Some(protocol) = capture(&TRANSPORT, raw) {
        let upper = protocol.to_uppercase();
        if upper.contains("SAS") || upper.contains("SCSI") {
            return Some(Connector::SCSI);
        }
        return Some(Connector::Other(upper));
    }
    None
}

fn detect_rotation(raw: &str) -> Option<bool> {
    let rate = capture(&ROTATION, raw)?;
    if rate.contains("Solid State") {
        Some(true)
    } else if rate.contains("rpm") {
        Some(false)
    } else {
        None
    }
}

/// The description starts on the status line itself; wrapped continuations
/// are indented relative to it. Appending stops at the first non-indented
/// line, and all runs of whitespace collapse to single spaces.
fn extract_status_description(lines: &[&str]) -> Option<String> {
    let idx = lines
        .iter()
        .position(|l| l.contains("Self-test execution status:"))?;

    let mut parts: Vec<&str> = Vec::new();
    if let Some(caps) = STATUS_DESC.captures(lines[idx]) {
        if let Some(m) = caps.get(1) {
            parts.push(m.as_str());
        }
    }
    for line in &lines[idx + 1..] {
        let indented = line
            .chars()
            .next()
            .map_or(false, |c| c == ' ' || c == '\t');
        if !indented {
            break;
        }
        parts.push(line);
    }

    let normalized = parts
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// History rows start with `#`; the line right after the structure marker
/// is the column header. The log replaces any prior history wholesale.
fn extract_test_log(lines: &[&str], report: &mut DiagnosticReport) {
    let idx = match lines.iter().position(|l| l.contains(SELFTEST_LOG_MARKER)) {
        Some(idx) => idx,
        None => return,
    };

    report.test_log_header = lines.get(idx + 1).map(|l| l.to_string());
    for line in &lines[idx + 1..] {
        if line.starts_with('#') {
            report.test_log.push(line.to_string());
        }
    }
}

/// Rows follow one line of column headers under the section header. A row
/// that fails the minimum-length check ends the table; a row whose id does
/// not parse is skipped.
fn extract_attributes(lines: &[&str], table: &mut AttributeTable) {
    let idx = match lines.iter().position(|l| l.trim_end() == ATTRIBUTE_SECTION) {
        Some(idx) => idx,
        None => return,
    };

    for line in lines.iter().skip(idx + 2) {
        if line.len() < attribute::MIN_ROW_LEN {
            break;
        }
        if let Some(attr) = Attribute::parse_row(line) {
            table.insert(attr);
        }
    }
}
