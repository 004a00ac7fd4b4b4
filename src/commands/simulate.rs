//! `simulate`: run the watch loop under an accelerated clock.
//!
//! Times are read in the configured location's timezone, so a simulation of
//! "2025-01-15 20:00:00" means 8 PM where the window is computed. The
//! simulated clock is installed before anything logs, which keeps every
//! timestamp on the simulated timeline.

use anyhow::Result;
use chrono::{DateTime, Local};
use chrono_tz::Tz;
use std::sync::Arc;

use super::watch::run_watch;
use crate::config::SettingsStore;
use crate::logger::Log;
use crate::signals::setup_signal_handler;
use crate::time_source::{self, SimulatedTimeSource};

/// Parse the simulation bounds in `tz`. The end must come after the start.
pub fn parse_bounds(
    start_time: &str,
    end_time: &str,
    tz: Tz,
) -> Result<(DateTime<Local>, DateTime<Local>)> {
    let start = time_source::parse_datetime_in_tz(start_time, tz)
        .map_err(|e| anyhow::anyhow!("Invalid start time: {}", e))?;
    let end = time_source::parse_datetime_in_tz(end_time, tz)
        .map_err(|e| anyhow::anyhow!("Invalid end time: {}", e))?;

    if end <= start {
        anyhow::bail!("End time must be after start time");
    }
    Ok((start.with_timezone(&Local), end.with_timezone(&Local)))
}

pub fn handle_simulate_command(
    start_time: &str,
    end_time: &str,
    multiplier: f64,
    log_to_file: bool,
    debug_enabled: bool,
) -> Result<()> {
    let tz = SettingsStore::load()?.get().timezone();
    let (start, end) = parse_bounds(start_time, end_time, tz)?;

    time_source::init_time_source(Arc::new(SimulatedTimeSource::new(start, end, multiplier)));
    Log::set_location_timezone(tz);

    let _guard = if log_to_file {
        let file_name = format!("qiyam-simulation-{}.log", start.format("%Y%m%d-%H%M%S"));
        let guard = Log::start_file_logging(file_name.clone())?;
        println!("Writing simulation output to {file_name}");
        Some(guard)
    } else {
        None
    };

    log_version!();
    log_block_start!("Simulation Mode");
    log_decorated!(
        "Simulating from {} to {} ({})",
        start_time,
        end_time,
        tz.name()
    );
    let duration = end - start;
    log_indented!(
        "Total simulated time: {} hours {} minutes",
        duration.num_hours(),
        duration.num_minutes() % 60
    );
    if multiplier == 0.0 {
        log_indented!("Time acceleration: fast-forward");
    } else {
        log_indented!(
            "Time acceleration: {}x (about {:.1} seconds)",
            multiplier,
            duration.num_seconds() as f64 / multiplier
        );
    }

    let signal_state = setup_signal_handler(debug_enabled)?;
    let report = run_watch(signal_state, debug_enabled)?;

    log_block_start!("Simulation finished");
    log_indented!("Phases: {}", report.phases.join(" → "));
    log_indented!(
        "Fetches: {} started, {} stored, {} discarded",
        report.fetches_started,
        report.fetches_stored,
        report.discarded
    );
    if let Some(error) = &report.last_error {
        log_indented!("Last error: {}", error);
    }
    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("simulate - Watch under a simulated clock");
    log_block_start!("Usage: qiyam simulate <start> <end> [multiplier] [OPTIONS]");
    log_block_start!("Arguments:");
    log_indented!("<start>, <end>  \"YYYY-MM-DD HH:MM:SS\" in the location's timezone");
    log_indented!("[multiplier]    Speed-up between 0.1 and 3600 (default 3600)");
    log_block_start!("Options:");
    log_indented!("--fast-forward  Run as fast as possible");
    log_indented!("--log           Write output to a timestamped log file");
    log_block_start!("Examples:");
    log_indented!("qiyam simulate \"2025-01-15 20:00:00\" \"2025-01-16 07:00:00\"");
    log_indented!("qiyam simulate \"2025-01-15 20:00:00\" \"2025-01-16 07:00:00\" --fast-forward");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bounds_in_location_timezone() {
        let (start, end) = parse_bounds(
            "2025-01-15 20:00:00",
            "2025-01-16 07:00:00",
            chrono_tz::Asia::Tokyo,
        )
        .unwrap();
        assert_eq!((end - start).num_hours(), 11);
        assert_eq!(
            start.with_timezone(&chrono_tz::Asia::Tokyo).format("%H:%M").to_string(),
            "20:00"
        );
    }

    #[test]
    fn test_parse_bounds_rejects_reversed_range() {
        assert!(
            parse_bounds(
                "2025-01-16 07:00:00",
                "2025-01-15 20:00:00",
                chrono_tz::UTC
            )
            .is_err()
        );
        assert!(parse_bounds("tonight", "2025-01-15 20:00:00", chrono_tz::UTC).is_err());
    }
}
