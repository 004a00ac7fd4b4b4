//! Loop messages and shutdown signal handling.
//!
//! Everything that wakes the watch loop arrives on one channel: completed
//! fetches from worker threads, debounced settings reloads from the file
//! watcher, and shutdown requests from the signal thread.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    sync::mpsc::{Receiver, Sender, channel},
    thread,
};

use crate::provider::fetch::FetchCompletion;

/// Everything the watch loop reacts to besides its own timers.
#[derive(Debug)]
pub enum LoopMessage {
    /// A worker finished fetching (key, generation) with this result
    FetchCompleted(FetchCompletion),
    /// The settings file changed on disk
    SettingsChanged,
    /// SIGINT, SIGTERM or SIGHUP
    Shutdown,
}

/// Channel and running flag shared between the loop and its producers.
pub struct SignalState {
    pub running: Arc<AtomicBool>,
    pub receiver: Receiver<LoopMessage>,
    pub sender: Sender<LoopMessage>,
}

impl SignalState {
    /// A channel with no signal thread attached, for simulations and tests.
    pub fn detached() -> Self {
        let (sender, receiver) = channel();
        Self {
            running: Arc::new(AtomicBool::new(true)),
            receiver,
            sender,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn shutdown_message(signal: i32, debug_enabled: bool) -> &'static str {
    match signal {
        SIGINT if debug_enabled => "Received SIGINT (Ctrl+C), shutting down...",
        SIGINT => "Received interrupt signal, shutting down...",
        SIGTERM => "Received termination request, shutting down...",
        SIGHUP => "Received hangup signal, shutting down...",
        _ => "Received shutdown signal, shutting down...",
    }
}

/// Install SIGINT/SIGTERM/SIGHUP handlers that post [`LoopMessage::Shutdown`].
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let state = SignalState::detached();
    let running = state.running.clone();
    let sender = state.sender.clone();

    let mut signals =
        Signals::new([SIGINT, SIGTERM, SIGHUP]).context("failed to register signal handlers")?;

    thread::spawn(move || {
        for sig in signals.forever() {
            log_pipe!();
            log_info!("{}", shutdown_message(sig, debug_enabled));

            running.store(false, Ordering::SeqCst);
            if sender.send(LoopMessage::Shutdown).is_err() {
                // Receiver gone: the loop has already exited
                break;
            }
        }
    });

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_state_runs_until_stopped() {
        let state = SignalState::detached();
        assert!(state.is_running());
        state.stop();
        assert!(!state.is_running());
    }

    #[test]
    fn test_messages_arrive_in_order() {
        let state = SignalState::detached();
        state.sender.send(LoopMessage::SettingsChanged).unwrap();
        state.sender.send(LoopMessage::Shutdown).unwrap();
        assert!(matches!(
            state.receiver.recv().unwrap(),
            LoopMessage::SettingsChanged
        ));
        assert!(matches!(state.receiver.recv().unwrap(), LoopMessage::Shutdown));
    }

    #[test]
    fn test_shutdown_messages() {
        assert!(shutdown_message(SIGINT, true).contains("Ctrl+C"));
        assert!(!shutdown_message(SIGINT, false).contains("Ctrl+C"));
        assert!(shutdown_message(SIGHUP, false).contains("hangup"));
    }
}
