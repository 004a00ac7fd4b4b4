//! `watch`: the live countdown, kept current until interrupted.

use anyhow::Result;
use std::sync::Arc;

use crate::config::{SettingsStore, start_settings_watcher};
use crate::core::{Core, CoreParams, WatchReport};
use crate::provider::AladhanClient;
use crate::signals::{SignalState, setup_signal_handler};

pub fn handle_watch_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    let signal_state = setup_signal_handler(debug_enabled)?;
    let report = run_watch(signal_state, debug_enabled)?;
    if let Some(error) = &report.last_error {
        log_debug!("Last fetch error: {}", error);
    }
    Ok(())
}

/// Load settings, start the settings watcher and run the loop until it stops.
pub fn run_watch(signal_state: SignalState, debug_enabled: bool) -> Result<WatchReport> {
    let store = SettingsStore::load()?;

    if let Err(e) = start_settings_watcher(
        store.path().to_path_buf(),
        signal_state.sender.clone(),
        debug_enabled,
    ) {
        log_pipe!();
        log_warning!("Settings changes will need a restart: {}", e);
    }

    let provider = Arc::new(AladhanClient::new()?);
    Core::new(CoreParams {
        provider,
        store,
        signal_state,
        debug_enabled,
    })
    .execute()
}

pub fn display_help() {
    log_version!();
    log_block_start!("watch - Live countdown to the last third of the night");
    log_block_start!("Usage: qiyam [watch]");
    log_block_start!("Description:");
    log_indented!("Fetches tonight's prayer times and keeps a status line with the");
    log_indented!("countdown and night progress. Announces when the last third");
    log_indented!("begins and ends, refetches after Fajr, and retries failed");
    log_indented!("fetches with backoff while showing the last known window.");
    log_block_start!("Settings:");
    log_indented!("Changes made with 'qiyam set' or by editing the settings file");
    log_indented!("apply immediately. Press Ctrl+C to stop.");
    log_end!();
}
