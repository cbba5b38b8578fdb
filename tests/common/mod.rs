/// Shared fixtures for integration tests: canned smartctl reports plus a
/// fake smartctl executable that serves one report per device path.
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Full scan of a healthy idle spinner.
pub fn idle_report(model: &str, serial: &str) -> String {
    format!(
        "\
smartctl 7.2 2020-12-30 r5155 [x86_64-linux-5.10.0] (local build)
Copyright (C) 2002-20, Bruce Allen, Christian Franke, www.smartmontools.org

=== START OF INFORMATION SECTION ===
Device Model:     {model}
Serial Number:    {serial}
User Capacity:    4,000,787,030,016 bytes [4.00 TB]
Rotation Rate:    5400 rpm
ATA Version is:   ACS-3 T13/2161-D revision 5
SATA Version is:  SATA 3.1, 6.0 Gb/s (current: 6.0 Gb/s)
SMART support is: Enabled

=== START OF READ SMART DATA SECTION ===
SMART overall-health self-assessment test result: PASSED

General SMART Values:
Self-test execution status:      (   0) The previous self-test routine completed
                                        without error or no self-test has ever
                                        been run.

Vendor Specific SMART Attributes with Thresholds:
ID# ATTRIBUTE_NAME          FLAG     VALUE WORST THRESH TYPE      UPDATED  WHEN_FAILED RAW_VALUE
  5 Reallocated_Sector_Ct   0x0033   200   200   140    Pre-fail  Always          -    0
  9 Power_On_Hours          0x0032   095   095   000    Old_age   Always          -    24299

SMART Self-test log structure revision number 1
Num  Test_Description    Status                  Remaining  LifeTime(hours)  LBA_of_first_error
# 1  Short offline       Completed without error       00%     24299         -
"
    )
}

/// Full scan of an SSD with a self-test just started (code 249).
pub fn testing_report(model: &str, serial: &str) -> String {
    format!(
        "\
smartctl 7.2 2020-12-30 r5155 [x86_64-linux-5.10.0] (local build)

=== START OF INFORMATION SECTION ===
Device Model:     {model}
Serial Number:    {serial}
User Capacity:    1,000,204,886,016 bytes [1.00 TB]
Rotation Rate:    Solid State Device
SATA Version is:  SATA 3.2, 6.0 Gb/s (current: 6.0 Gb/s)

=== START OF READ SMART DATA SECTION ===
Self-test execution status:      ( 249) Self-test routine in progress...
                                        10% of test remaining.

Vendor Specific SMART Attributes with Thresholds:
ID# ATTRIBUTE_NAME          FLAG     VALUE WORST THRESH TYPE      UPDATED  WHEN_FAILED RAW_VALUE
  5 Reallocated_Sector_Ct   0x0033   100   100   010    Pre-fail  Always          -    0
  9 Power_On_Hours          0x0032   099   099   000    Old_age   Always          -    1042
"
    )
}

/// Output for a drive behind an enclosure the tool cannot talk through.
pub fn bridge_report() -> String {
    "\
smartctl 7.2 2020-12-30 r5155 [x86_64-linux-5.10.0] (local build)

/dev/sdx: Unknown USB bridge [0x152d:0x2338 (0x100)]
Please specify device type with the -d option.

Use smartctl -h to get a usage summary
"
    .to_string()
}

/// Install a fake smartctl that serves `<basename>.txt` from its own
/// directory for whatever device path it is invoked on.
pub fn install_fake_smartctl(dir: &Path) -> PathBuf {
    let script = dir.join("smartctl");
    let body = "#!/bin/sh\n\
                dir=\"$(dirname \"$0\")\"\n\
                for arg in \"$@\"; do dev=\"$arg\"; done\n\
                cat \"$dir/$(basename \"$dev\").txt\" 2>/dev/null\n";
    fs::write(&script, body).expect("write fake smartctl");

    let mut perms = fs::metadata(&script)
        .expect("stat fake smartctl")
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&script, perms).expect("chmod fake smartctl");
    script
}

/// Drop the canned report the fake smartctl will serve for `device`.
pub fn write_report(dir: &Path, device: &str, report: &str) {
    let name = Path::new(device)
        .file_name()
        .expect("device needs a file name")
        .to_string_lossy()
        .into_owned();
    fs::write(dir.join(format!("{}.txt", name)), report).expect("write canned report");
}
