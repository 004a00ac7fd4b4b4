//! `show`: tonight's window, state and prayer schedule, as text or JSON.

use anyhow::Result;

use super::{Tonight, load_tonight, report_error};
use crate::config::{SettingsStore, TimeFormat};
use crate::display::{
    format_countdown, format_duration, format_progress, format_time, schedule_lines, virtue_for,
};
use crate::logger::Log;
use crate::night::WindowState;
use crate::provider::AladhanClient;

pub fn handle_show_command(json: bool) -> Result<()> {
    if json {
        // Keep stdout clean for the JSON document
        Log::set_enabled(false);
    } else {
        log_version!();
    }

    let store = SettingsStore::load()?;
    let provider = AladhanClient::new()?;
    let now = crate::time_source::now();

    match load_tonight(&provider, store.get(), now) {
        Ok(tonight) if json => {
            println!("{}", serde_json::to_string_pretty(&tonight)?);
            Ok(())
        }
        Ok(tonight) => {
            display_tonight(&tonight, store.get().time_format);
            log_end!();
            Ok(())
        }
        Err(error) if json => {
            let body = serde_json::json!({
                "error": error.user_message(),
                "detail": error.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            Err(error.into())
        }
        Err(error) => {
            report_error(&error);
            log_end!();
            Err(error.into())
        }
    }
}

pub fn display_tonight(tonight: &Tonight, format: TimeFormat) {
    let window = &tonight.window;

    log_block_start!("Qiyam window for {}", tonight.location);
    log_indented!("Starts: {}", format_time(&window.start, format));
    log_indented!("Ends (Fajr): {}", format_time(&window.end, format));
    log_indented!(
        "Night Duration: {} (from {})",
        format_duration(window.night_duration_minutes),
        window.convention.night_start_label()
    );
    log_indented!("Last third: {}", format_duration(window.last_third_minutes));
    log_indented!(
        "Middle of Night: {}",
        format_time(&window.middle_of_night, format)
    );

    if let Some(warning) = tonight.validation.warning {
        log_pipe!();
        log_warning!("{}", warning);
    }

    match tonight.state {
        WindowState::Pending { countdown } => {
            log_block_start!("Starts in {}", format_countdown(&countdown));
        }
        WindowState::Active => log_block_start!("The last third of the night is now"),
        WindowState::Ended => log_block_start!("Tonight's window has ended"),
    }
    log_indented!("Night progress: {}", format_progress(tonight.progress));

    log_block_start!("Prayer times ({}, {})", tonight.date, tonight.timezone);
    for line in schedule_lines(&tonight.schedule, format) {
        log_indented!("{}", line);
    }
    if let Some(method) = &tonight.method {
        log_indented!("Method: {}", method);
    }

    let virtue = virtue_for(tonight.date);
    log_block_start!("\"{}\"", virtue.text);
    log_indented!("{}", virtue.source);
}
