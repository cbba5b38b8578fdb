use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use drivewatch::device::summary;
use drivewatch::probe::eta;
use drivewatch::{is_interrupted, DriveRegistry, MonitorConfig, Smartctl, TestKind};
use log::warn;
use std::thread;
use std::time::{Duration, Instant};

// Cadence of the non-blocking query polls between refresh cycles.
const POLL_TICK: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "drivewatch")]
#[command(about = "Continuous SMART health monitoring for fleets of local storage drives")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Path to the smartctl binary
    #[arg(long, global = true)]
    smartctl: Option<String>,

    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Continuously refresh and print the drive summary table
    Monitor {
        /// Device paths to monitor (overrides the enumeration pattern)
        #[arg(short, long)]
        device: Vec<String>,

        /// Glob pattern used to enumerate devices
        #[arg(short, long)]
        pattern: Option<String>,

        /// Seconds between refresh cycles
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Run one refresh cycle, print the summary, and exit
    List {
        /// Device paths to list (overrides the enumeration pattern)
        #[arg(short, long)]
        device: Vec<String>,

        /// Glob pattern used to enumerate devices
        #[arg(short, long)]
        pattern: Option<String>,

        /// Print machine-readable JSON snapshots instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Start a device self-test
    Test {
        /// Device path (e.g., /dev/sda)
        device: String,

        /// Test kind (short, long)
        #[arg(short, long, default_value = "short")]
        kind: String,
    },

    /// Abort a running device self-test
    Abort {
        /// Device path (e.g., /dev/sda)
        device: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_signal_handlers()?;

    let level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if !is_root() {
        warn!("not running as root; smartctl queries will likely be refused");
    }

    let mut config = MonitorConfig::load(cli.config.as_deref())?;
    if let Some(binary) = &cli.smartctl {
        config.smartctl_path = binary.clone();
    }

    match &cli.command {
        Commands::Monitor {
            device,
            pattern,
            interval,
        } => {
            apply_selection(&mut config, device, pattern.as_deref());
            if let Some(secs) = interval {
                config.refresh_interval_secs = *secs;
            }
            monitor_loop(config)
        }
        Commands::List {
            device,
            pattern,
            json,
        } => {
            apply_selection(&mut config, device, pattern.as_deref());
            list_drives(config, *json)
        }
        Commands::Test { device, kind } => start_test(&config, device, kind),
        Commands::Abort { device } => abort_test(&config, device),
    }
}

fn apply_selection(config: &mut MonitorConfig, devices: &[String], pattern: Option<&str>) {
    if let Some(pattern) = pattern {
        config.device_pattern = pattern.to_string();
        config.device_paths.clear();
    }
    if !devices.is_empty() {
        config.device_paths = devices.to_vec();
    }
}

/// The cooperative polling loop: refresh on the configured cadence, advance
/// pending queries every tick, redraw when something completed.
fn monitor_loop(config: MonitorConfig) -> Result<()> {
    let interval = Duration::from_secs(config.refresh_interval_secs.max(1));
    let mut registry = DriveRegistry::new(config);
    let mut next_refresh = Instant::now();

    while !is_interrupted() {
        if Instant::now() >= next_refresh {
            for (path, err) in registry.refresh_all() {
                warn!("{}: {}", path, err);
            }
            next_refresh = Instant::now() + interval;
        }

        if !registry.poll_all().is_empty() {
            print_table(&registry);
        }

        thread::sleep(POLL_TICK);
    }

    Ok(())
}

fn list_drives(config: MonitorConfig, json: bool) -> Result<()> {
    let mut registry = DriveRegistry::new(config);
    for (path, err) in registry.refresh_all() {
        warn!("{}: {}", path, err);
    }

    // One cycle only: wait for the outstanding queries, then report.
    let deadline = Instant::now() + Duration::from_secs(60);
    while registry.query_pending() && Instant::now() < deadline && !is_interrupted() {
        registry.poll_all();
        thread::sleep(POLL_TICK);
    }

    if json {
        let snapshots: Vec<_> = registry.drives().map(|d| d.snapshot()).collect();
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
    } else {
        print_table(&registry);
        print_failed_attributes(&registry);
    }

    Ok(())
}

fn start_test(config: &MonitorConfig, device: &str, kind: &str) -> Result<()> {
    let kind = match kind {
        "short" => TestKind::Short,
        "long" => TestKind::Long,
        other => anyhow::bail!("unknown test kind: {} (expected short or long)", other),
    };

    let tool = Smartctl::new(config.smartctl_path.clone());
    let output = tool.start_test(device, kind)?;
    println!("Started {} self-test on {}", kind, device);

    if let Some(completion) = eta::parse_completion_time(&output) {
        let left = eta::time_remaining(completion, Local::now());
        println!(
            "Expected completion: {} ({} from now)",
            completion.format("%c"),
            eta::format_remaining(left)
        );
    }

    Ok(())
}

fn abort_test(config: &MonitorConfig, device: &str) -> Result<()> {
    let tool = Smartctl::new(config.smartctl_path.clone());
    tool.abort_test(device)?;
    println!("Abort requested on {}", device);
    Ok(())
}

fn print_table(registry: &DriveRegistry) {
    let header = summary::header_line();
    println!("{}", header.as_str().bold());
    for drive in registry.drives() {
        let line = drive.summary_row().to_line();
        if drive.has_failed_attributes() || drive.reallocated_sectors().unwrap_or(0) > 0 {
            println!("{}", line.as_str().red());
        } else if drive.state().is_testing() {
            println!("{}", line.as_str().yellow());
        } else {
            println!("{}", line);
        }
    }
}

fn print_failed_attributes(registry: &DriveRegistry) {
    for drive in registry.drives() {
        if !drive.has_failed_attributes() {
            continue;
        }
        println!("\n{} failing attributes:", drive.path().bold());
        for attr in drive.attributes().iter().filter(|a| a.has_failed()) {
            println!(
                "  {:>3} {:<24} failed {:<12} raw {}",
                attr.id, attr.name, attr.when_failed, attr.raw
            );
        }
    }
}

// Signal handler for graceful shutdown
fn setup_signal_handlers() -> Result<()> {
    use signal_hook::{consts::SIGINT, iterator::Signals};

    let mut signals = Signals::new([SIGINT])?;

    thread::spawn(move || {
        for sig in signals.forever() {
            if sig == SIGINT {
                eprintln!("\nInterrupt received, shutting down...");
                drivewatch::set_interrupted();
            }
        }
    });

    Ok(())
}

fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}
