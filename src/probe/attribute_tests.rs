/// Tests for vendor attribute table decoding
///
/// Rows are real-format smartctl attribute lines; the fixed column offsets
/// must slice them exactly.
use super::attribute::*;

// Well-formed rows at smartctl's printf offsets.
const ROW_READ_ERROR: &str =
    "  1 Raw_Read_Error_Rate     0x002f   200   200   051    Pre-fail  Always          -    0";
const ROW_REALLOC_FAILING: &str =
    "  5 Reallocated_Sector_Ct   0x0033   100   092   140    Pre-fail  Always   FAILING_NOW 1032";
const ROW_HOURS: &str =
    "  9 Power_On_Hours          0x0032   095   095   000    Old_age   Always          -    24299";
const ROW_GSENSE: &str =
    "191 G-Sense_Error_Rate      0x0032   001   001   000    Old_age   Always          -    292";
const ROW_TEMPERATURE: &str =
    "194 Temperature_Celsius     0x0022   057   043   000    Old_age   Always          -    43 (Min/Max 21/45)";

// ============================================================================
// Row Decoding Tests
// ============================================================================

#[test]
fn test_parse_row_basic_fields() {
    let attr = Attribute::parse_row(ROW_READ_ERROR).expect("row should decode");

    assert_eq!(attr.id, 1);
    assert_eq!(attr.name, "Raw_Read_Error_Rate");
    assert_eq!(attr.flags, "0x002f");
    assert_eq!(attr.value, Some(200));
    assert_eq!(attr.worst, Some(200));
    assert_eq!(attr.threshold, Some(51));
    assert_eq!(attr.attr_type, "Pre-fail");
    assert_eq!(attr.updated, "Always");
    assert_eq!(attr.when_failed, "-");
    assert_eq!(attr.raw, "0");
}

#[test]
fn test_parse_row_three_digit_id() {
    let attr = Attribute::parse_row(ROW_GSENSE).expect("row should decode");
    assert_eq!(attr.id, 191);
    assert_eq!(attr.name, "G-Sense_Error_Rate");
    assert_eq!(attr.raw, "292");
}

#[test]
fn test_parse_row_composite_raw_value() {
    let attr = Attribute::parse_row(ROW_TEMPERATURE).expect("row should decode");
    assert_eq!(attr.raw, "43 (Min/Max 21/45)");
    assert_eq!(attr.raw_number(), Some(43), "leading number of composite raw");
}

#[test]
fn test_parse_row_too_short_is_rejected() {
    assert!(
        Attribute::parse_row("  5 Reallocated_Sector_Ct   0x0033   100").is_none(),
        "a row below the minimum length ends the table"
    );
    assert!(Attribute::parse_row("").is_none());
}

#[test]
fn test_parse_row_non_numeric_id_is_rejected() {
    // Same shape as a valid row but the id column is not a number.
    let bogus =
        "ID# ATTRIBUTE_NAME          FLAG     VALUE WORST THRESH TYPE      UPDATED  WHEN_FAILED RAW_VALUE";
    assert!(Attribute::parse_row(bogus).is_none());
}

// ============================================================================
// Failure Marker Tests
// ============================================================================

#[test]
fn test_never_failed_marker() {
    let attr = Attribute::parse_row(ROW_HOURS).expect("row should decode");
    assert!(!attr.has_failed(), "dash means the attribute never failed");
}

#[test]
fn test_failing_now_marker() {
    let attr = Attribute::parse_row(ROW_REALLOC_FAILING).expect("row should decode");
    assert_eq!(attr.when_failed, "FAILING_NOW");
    assert!(attr.has_failed());
    assert_eq!(attr.raw_number(), Some(1032));
}

// ============================================================================
// Table Tests
// ============================================================================

fn sample_table() -> AttributeTable {
    let mut table = AttributeTable::new();
    for row in [ROW_READ_ERROR, ROW_REALLOC_FAILING, ROW_HOURS, ROW_GSENSE] {
        table.insert(Attribute::parse_row(row).expect("fixture row should decode"));
    }
    table
}

#[test]
fn test_table_is_sparse() {
    let table = sample_table();
    assert_eq!(table.len(), 4);
    assert!(table.get(5).is_some());
    assert!(
        table.get(194).is_none(),
        "an id that was never reported is unset, not zero"
    );
}

#[test]
fn test_table_failed_ids() {
    let table = sample_table();
    let failed = table.failed_ids();
    assert_eq!(failed.into_iter().collect::<Vec<_>>(), vec![5]);
}

#[test]
fn test_table_iterates_in_id_order() {
    let table = sample_table();
    let ids: Vec<u8> = table.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 5, 9, 191]);
}

#[test]
fn test_empty_table() {
    let table = AttributeTable::new();
    assert!(table.is_empty());
    assert!(table.failed_ids().is_empty());
}
