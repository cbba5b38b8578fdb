//! Plain fixed-width summary data for tabular display.
//!
//! The display layer owns every color and markup decision; this module only
//! produces padded plain-text cells so many drives line up into a readable
//! table.

// Column widths, not counting the one-space separator each cell carries.
pub const CW_PATH: usize = 8;
pub const CW_CONNECTOR: usize = 4;
pub const CW_TYPE: usize = 4;
pub const CW_SIZE: usize = 8;
pub const CW_MODEL: usize = 20;
pub const CW_SERIAL: usize = 16;
pub const CW_REALLOC: usize = 7;
pub const CW_HOURS: usize = 7;
pub const CW_GSENSE: usize = 5;
pub const CW_WHEN_FAILED: usize = 10;
pub const CW_TEST_STATE: usize = 22;

/// One drive's summary as already-formatted plain cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub path: String,
    pub connector: String,
    pub kind: String,
    pub capacity: String,
    pub model: String,
    pub serial: String,
    pub reallocated: String,
    pub hours: String,
    pub gsense: String,
    pub when_failed: String,
    pub test_state: String,
}

impl SummaryRow {
    /// Render the row as one padded line.
    pub fn to_line(&self) -> String {
        let mut line = String::new();
        line.push_str(&left_column(&self.path, CW_PATH));
        line.push_str(&left_column(&self.connector, CW_CONNECTOR));
        line.push_str(&left_column(&self.kind, CW_TYPE));
        line.push_str(&left_column(&self.capacity, CW_SIZE));
        line.push_str(&left_column(&self.model, CW_MODEL));
        line.push_str(&left_column(&self.serial, CW_SERIAL));
        line.push_str(&left_column(&self.reallocated, CW_REALLOC));
        line.push_str(&left_column(&self.hours, CW_HOURS));
        line.push_str(&left_column(&self.gsense, CW_GSENSE));
        line.push_str(&left_column(&self.when_failed, CW_WHEN_FAILED));
        line.push_str(&left_column(&self.test_state, CW_TEST_STATE));
        line
    }
}

/// Column header matching `SummaryRow::to_line`.
pub fn header_line() -> String {
    let mut line = String::new();
    line.push_str(&left_column("Path", CW_PATH));
    line.push_str(&left_column("Conn", CW_CONNECTOR));
    line.push_str(&left_column("Type", CW_TYPE));
    line.push_str(&left_column("Size", CW_SIZE));
    line.push_str(&left_column("Model", CW_MODEL));
    line.push_str(&left_column("Serial", CW_SERIAL));
    line.push_str(&left_column("ReAlloc", CW_REALLOC));
    line.push_str(&left_column("Hours", CW_HOURS));
    line.push_str(&left_column("GSen", CW_GSENSE));
    line.push_str(&left_column("WhenFail", CW_WHEN_FAILED));
    line.push_str(&left_column("TestState", CW_TEST_STATE));
    line
}

/// Left-justify into a column: pad short text to `width` plus a separator
/// space, or truncate long text with an ellipsis.
pub fn left_column(text: &str, width: usize) -> String {
    let length = text.chars().count();
    if length <= width {
        let mut cell = text.to_string();
        cell.extend(std::iter::repeat(' ').take(width - length + 1));
        cell
    } else {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}... ", kept)
    }
}
