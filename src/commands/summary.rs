//! `summary`: print the shareable plain-text window to stdout.

use anyhow::Result;

use super::{load_tonight, report_error};
use crate::config::SettingsStore;
use crate::display::summary_text;
use crate::logger::Log;
use crate::provider::AladhanClient;

pub fn handle_summary_command() -> Result<()> {
    // Only the summary itself goes to stdout
    Log::set_enabled(false);

    let store = SettingsStore::load()?;
    let provider = AladhanClient::new()?;
    let settings = store.get();

    match load_tonight(&provider, settings, crate::time_source::now()) {
        Ok(tonight) => {
            println!(
                "{}",
                summary_text(
                    &tonight.window,
                    settings.address.as_deref(),
                    settings.time_format
                )
            );
            Ok(())
        }
        Err(error) => {
            Log::set_enabled(true);
            log_version!();
            report_error(&error);
            log_end!();
            Err(error.into())
        }
    }
}
