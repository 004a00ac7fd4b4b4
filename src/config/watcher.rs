//! Hot reload: watch the settings file and tell the watch loop when it changed.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread;
use std::time::Duration;

use crate::constants::SETTINGS_RELOAD_DEBOUNCE;
use crate::signals::LoopMessage;

/// Whether an event touches the settings file.
///
/// The parent directory is watched, so atomic saves (temp file renamed over
/// the target) and editor swap files show up here too.
fn affects_settings(event: &Event, settings_path: &Path) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    // Only the settings directory is watched, so the file name is enough
    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == settings_path.file_name())
}

/// Wait until no event has arrived for `quiet`. Returns false when the sender is gone.
fn settle(events: &Receiver<Event>, quiet: Duration) -> bool {
    loop {
        match events.recv_timeout(quiet) {
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) => return true,
            Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
}

/// Start watching `settings_path`. Each burst of changes sends one
/// [`LoopMessage::SettingsChanged`] once it has been quiet for the debounce period.
pub fn start_settings_watcher(
    settings_path: PathBuf,
    sender: Sender<LoopMessage>,
    debug_enabled: bool,
) -> Result<()> {
    let dir = settings_path
        .parent()
        .context("Settings path has no parent directory")?
        .to_path_buf();

    let (tx, rx) = channel();
    let watched = settings_path.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res
                && affects_settings(&event, &watched)
            {
                let _ = tx.send(event);
            }
        },
        NotifyConfig::default(),
    )
    .context("Failed to create file watcher")?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch directory: {}", dir.display()))?;

    if debug_enabled {
        log_pipe!();
        log_debug!("Watching settings for changes: {}", settings_path.display());
    }

    thread::spawn(move || {
        // The watcher stops when dropped, so it lives as long as this thread
        let _watcher = watcher;

        while rx.recv().is_ok() {
            if !settle(&rx, SETTINGS_RELOAD_DEBOUNCE) {
                break;
            }
            if debug_enabled {
                log_pipe!();
                log_debug!("Settings file change detected");
            }
            if sender.send(LoopMessage::SettingsChanged).is_err() {
                break;
            }
        }
    });

    Ok(())
}
