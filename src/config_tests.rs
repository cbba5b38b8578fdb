/// Tests for configuration and status-code classification
use crate::config::{MonitorConfig, StatusCodeMap};
use std::io::Write;
use test_case::test_case;

// ============================================================================
// Status Code Classification
// ============================================================================

#[test_case(0 => true; "plain idle")]
#[test_case(16 => true; "aborted")]
#[test_case(24 => true; "aborted alt")]
#[test_case(25 => true; "aborted alt two")]
#[test_case(32 => true; "interrupted")]
#[test_case(33 => true; "interrupted alt")]
#[test_case(118 => false; "read failure result")]
#[test_case(249 => false; "active code is not idle")]
fn classify_idle(code: u8) -> bool {
    StatusCodeMap::default().is_idle(code)
}

#[test_case(239 => false; "below the range")]
#[test_case(240 => true; "bottom of range")]
#[test_case(245 => true; "mid range")]
#[test_case(249 => true; "top of range")]
#[test_case(250 => false; "above the range")]
fn classify_active(code: u8) -> bool {
    StatusCodeMap::default().is_active(code)
}

#[test_case(249 => Some(10); "just started")]
#[test_case(245 => Some(50); "half way")]
#[test_case(240 => Some(100); "about to finish")]
#[test_case(0 => None; "idle code has no progress")]
#[test_case(118 => None; "result code has no progress")]
fn completion(code: u8) -> Option<u8> {
    StatusCodeMap::default().completion_percent(code)
}

#[test]
fn test_active_min_derives_from_max_and_count() {
    let map = StatusCodeMap::default();
    assert_eq!(map.active_min(), 240, "top ten codes below the maximum");

    let narrow = StatusCodeMap {
        active_max: 200,
        active_count: 3,
        ..StatusCodeMap::default()
    };
    assert_eq!(narrow.active_min(), 198);
    assert!(narrow.is_active(198));
    assert!(!narrow.is_active(197));
}

#[test]
fn test_completion_is_clamped() {
    // A wider-than-ten range cannot push the percentage past 100.
    let wide = StatusCodeMap {
        active_max: 249,
        active_count: 20,
        ..StatusCodeMap::default()
    };
    assert_eq!(wide.completion_percent(230), Some(100));
}

#[test]
fn test_custom_idle_set_is_honored() {
    let map = StatusCodeMap {
        idle: vec![0, 2],
        ..StatusCodeMap::default()
    };
    assert!(map.is_idle(2));
    assert!(!StatusCodeMap::default().is_idle(2));
}

// ============================================================================
// Config Loading
// ============================================================================

#[test]
fn test_defaults() {
    let config = MonitorConfig::default();

    assert_eq!(config.smartctl_path, "smartctl");
    assert_eq!(config.device_pattern, "/dev/sd?");
    assert!(config.device_paths.is_empty());
    assert_eq!(config.refresh_interval_secs, 30);
}

#[test]
fn test_load_without_file_gives_defaults() {
    let config = MonitorConfig::load(None).expect("defaults should load");
    assert_eq!(config.smartctl_path, MonitorConfig::default().smartctl_path);
    assert_eq!(config.status_codes.active_max, 249);
}

#[test]
fn test_load_from_file_overrides_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("monitor.toml");
    let mut file = std::fs::File::create(&path).expect("config file");
    writeln!(
        file,
        "smartctl_path = \"/opt/sbin/smartctl\"\n\
         refresh_interval_secs = 5\n\
         \n\
         [status_codes]\n\
         idle = [0, 2]\n\
         active_max = 247"
    )
    .expect("write config");

    let name = dir.path().join("monitor");
    let config =
        MonitorConfig::load(name.to_str()).expect("file should load");

    assert_eq!(config.smartctl_path, "/opt/sbin/smartctl");
    assert_eq!(config.refresh_interval_secs, 5);
    assert_eq!(config.status_codes.idle, vec![0, 2]);
    assert_eq!(config.status_codes.active_max, 247);
    // Untouched keys keep their defaults.
    assert_eq!(config.device_pattern, "/dev/sd?");
    assert_eq!(config.status_codes.aborted, vec![16, 24, 25]);
}

#[test]
fn test_load_missing_file_is_an_error() {
    let result = MonitorConfig::load(Some("/nonexistent/drivewatch-config"));
    assert!(result.is_err());
}
