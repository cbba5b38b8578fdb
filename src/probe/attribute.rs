//! Vendor attribute table decoding.
//!
//! smartctl prints the attribute section with printf-fixed column widths
//! that are stable for a given major version, so rows are decoded by
//! slicing at fixed offsets rather than splitting on whitespace (attribute
//! names and raw values may themselves contain separators).

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap, BTreeSet};
use std::ops::Range;

/// Reallocated sector count.
pub const ATTR_REALLOCATED: u8 = 5;
/// Power-on hours counter.
pub const ATTR_POWER_ON_HOURS: u8 = 9;
/// G-sense error rate.
pub const ATTR_GSENSE: u8 = 191;
/// Vendor-alternative G-sense error rate.
pub const ATTR_GSENSE_ALT: u8 = 221;

// Column offsets of smartctl's attribute printer:
// ID# ATTRIBUTE_NAME          FLAG     VALUE WORST THRESH TYPE      UPDATED  WHEN_FAILED RAW_VALUE
const COL_ID: Range<usize> = 0..3;
const COL_NAME: Range<usize> = 4..28;
const COL_FLAGS: Range<usize> = 28..34;
const COL_VALUE: Range<usize> = 37..40;
const COL_WORST: Range<usize> = 43..46;
const COL_THRESH: Range<usize> = 49..52;
const COL_TYPE: Range<usize> = 56..66;
const COL_UPDATED: Range<usize> = 66..75;
const COL_WHEN_FAILED: Range<usize> = 75..87;
const COL_RAW_START: usize = 87;

/// Shortest line that still reaches the raw-value column.
pub const MIN_ROW_LEN: usize = COL_RAW_START + 1;

/// The WHEN_FAILED column reads `-` while the attribute has never crossed
/// its threshold.
const NEVER_FAILED: &str = "-";

lazy_static! {
    static ref LEADING_NUMBER: Regex = Regex::new(r"(\d+)").unwrap();
}

/// One vendor-specific health metric as reported by the drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: u8,
    pub name: String,
    /// Attribute flags as printed, e.g. `0x0033`.
    pub flags: String,
    /// Current normalized value.
    pub value: Option<u8>,
    /// Worst recorded normalized value.
    pub worst: Option<u8>,
    /// Failure threshold for the normalized value.
    pub threshold: Option<u8>,
    /// Generally `Pre-fail` or `Old_age`.
    pub attr_type: String,
    /// Generally `Always` or `Offline`.
    pub updated: String,
    /// `-` while the attribute has never failed, otherwise when it did.
    pub when_failed: String,
    /// Raw (non-normalized) value, verbatim.
    pub raw: String,
}

impl Attribute {
    /// Decode one table row. Returns `None` when the line fails the
    /// minimum-length check (which ends the table) or its id column is not
    /// a number.
    pub fn parse_row(line: &str) -> Option<Attribute> {
        if line.len() < MIN_ROW_LEN {
            return None;
        }

        let slice = |range: Range<usize>| line.get(range).unwrap_or("").trim().to_string();

        let id: u8 = line.get(COL_ID)?.trim().parse().ok()?;

        Some(Attribute {
            id,
            name: slice(COL_NAME),
            flags: slice(COL_FLAGS),
            value: line.get(COL_VALUE).and_then(|s| s.trim().parse().ok()),
            worst: line.get(COL_WORST).and_then(|s| s.trim().parse().ok()),
            threshold: line.get(COL_THRESH).and_then(|s| s.trim().parse().ok()),
            attr_type: slice(COL_TYPE),
            updated: slice(COL_UPDATED),
            when_failed: slice(COL_WHEN_FAILED),
            raw: line.get(COL_RAW_START..).unwrap_or("").trim().to_string(),
        })
    }

    /// True when the WHEN_FAILED marker is anything but the never-failed
    /// sentinel.
    pub fn has_failed(&self) -> bool {
        !self.when_failed.is_empty() && self.when_failed != NEVER_FAILED
    }

    /// Leading integer of the raw value. Raw values are frequently
    /// composite ("43 (Min/Max 21/45)", "4123h+32m"); the leading number is
    /// the portion with a defined meaning for the ids we promote.
    pub fn raw_number(&self) -> Option<u64> {
        LEADING_NUMBER
            .captures(&self.raw)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Sparse id-indexed attribute collection. Absent ids are unset, not zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTable {
    entries: BTreeMap<u8, Attribute>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attribute: Attribute) {
        self.entries.insert(attribute.id, attribute);
    }

    pub fn get(&self, id: u8) -> Option<&Attribute> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.values()
    }

    /// Ids whose failure marker is active.
    pub fn failed_ids(&self) -> BTreeSet<u8> {
        self.entries
            .values()
            .filter(|a| a.has_failed())
            .map(|a| a.id)
            .collect()
    }
}

impl<'a> IntoIterator for &'a AttributeTable {
    type Item = &'a Attribute;
    type IntoIter = btree_map::Values<'a, u8, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}
