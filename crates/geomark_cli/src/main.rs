//! CLI entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `geomark_core` linkage.
//! - Replay recorded fixes against a marker file for offline checks.
//!
//! Usage:
//! - `geomark` prints ping/version.
//! - `geomark replay <markers.json>` reads `lat,lon[,accuracy]` lines from
//!   stdin and prints one line per fix plus one line per alert.

use clap::{Parser, Subcommand};
use geomark_core::{
    default_log_level, init_logging, AlertDispatcher, AlertQueue, FixOutcome, LocationFix,
    Marker, ProximityConfig, ProximityTracker,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

const LOG_DIR_ENV: &str = "GEOMARK_LOG_DIR";

#[derive(Parser)]
#[command(name = "geomark")]
#[command(about = "Proximity core smoke checks and offline fix replays", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Replay `lat,lon[,accuracy]` lines from stdin against a marker file
    Replay {
        /// JSON array of markers
        markers: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        None => {
            println!("geomark_core ping={}", geomark_core::ping());
            println!("geomark_core version={}", geomark_core::core_version());
            Ok(())
        }
        Some(Command::Replay { markers }) => replay(&markers),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn replay(markers_path: &Path) -> Result<(), String> {
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        init_logging(default_log_level(), &log_dir)?;
    }

    let markers = load_markers(markers_path)?;
    let config = ProximityConfig::from_env().map_err(|err| err.to_string())?;
    let queue = Arc::new(AlertQueue::new());
    let mut tracker = ProximityTracker::new(config, AlertDispatcher::new(queue.clone()));

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for (index, line) in stdin.lock().lines().enumerate() {
        let line = line.map_err(|err| format!("stdin read failed: {err}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fix = parse_fix(trimmed).map_err(|err| format!("line {}: {err}", index + 1))?;

        let summary = match tracker.handle_fix(fix, &markers) {
            FixOutcome::Rejected => "rejected".to_string(),
            FixOutcome::Skipped { moved_m } => format!("skipped moved_m={moved_m:.1}"),
            FixOutcome::Evaluated { nearby, .. } => format!("evaluated nearby={}", nearby.len()),
        };
        write_line(&mut stdout, &format!("fix {} {summary}", index + 1))?;
        for alert in queue.drain() {
            write_line(
                &mut stdout,
                &format!("alert marker_id={} {}", alert.marker_id, alert.body),
            )?;
        }
    }
    Ok(())
}

fn load_markers(path: &Path) -> Result<Vec<Marker>, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("cannot read markers file `{}`: {err}", path.display()))?;
    let markers: Vec<Marker> =
        serde_json::from_str(&raw).map_err(|err| format!("invalid markers file: {err}"))?;
    for marker in &markers {
        marker.validate().map_err(|err| err.to_string())?;
    }
    Ok(markers)
}

fn parse_fix(line: &str) -> Result<LocationFix, String> {
    let fields = line.split(',').map(str::trim).collect::<Vec<_>>();
    let number = |index: usize| -> Result<f64, String> {
        let raw = fields
            .get(index)
            .ok_or_else(|| format!("expected lat,lon[,accuracy], got `{line}`"))?;
        raw.parse::<f64>()
            .map_err(|_| format!("`{raw}` is not a number"))
    };

    let mut fix = LocationFix::new(number(0)?, number(1)?);
    if fields.len() > 2 {
        fix = fix.with_accuracy(number(2)?);
    }
    Ok(fix)
}

fn write_line(out: &mut impl Write, line: &str) -> Result<(), String> {
    writeln!(out, "{line}").map_err(|err| format!("stdout write failed: {err}"))
}
