//! Structured terminal logging with box-drawing output.
//!
//! Every line is routed through [`write_output`], which prints to stdout or,
//! while `--log` is active, hands the line to a writer thread that appends it
//! to a file with ANSI colors stripped.
//!
//! ## Logging Conventions
//!
//! - `log_block_start!` opens a new conceptual block (`┃` spacer, then `┣ message`).
//! - `log_decorated!` continues a block (`┣ message`).
//! - `log_indented!` lists details that belong to the previous line (`┃   message`).
//! - `log_pipe!` inserts a bare `┃` before a semantic message that starts its own block.
//! - `log_version!` prints the `┏ qiyam vX.Y.Z ━━╸` header, `log_end!` the closing `╹`.
//! - `log_info!`, `log_warning!`, `log_error!`, `log_debug!`, `log_critical!` carry a
//!   colored `[LEVEL]` tag.

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

// Timezone of the selected location, used for simulation timestamps
static LOCATION_TIMEZONE: OnceLock<chrono_tz::Tz> = OnceLock::new();

static LOG_CHANNEL: OnceLock<Sender<LogMessage>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

pub struct Log;

impl Log {
    /// Enable or disable all log output (used for `--json` output and tests).
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Show `log_debug!` lines (`--debug`).
    pub fn set_debug(enabled: bool) {
        DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_debug() -> bool {
        DEBUG_ENABLED.load(Ordering::SeqCst)
    }

    /// Record the location timezone so simulated timestamps show the location's clock.
    pub fn set_location_timezone(tz: chrono_tz::Tz) {
        let _ = LOCATION_TIMEZONE.set(tz);
    }

    /// Route all further output to `file_path` until the guard is dropped.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(tx.clone())
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::spawn(move || {
            let mut file = std::fs::File::create(&file_path)?;

            loop {
                match rx.recv() {
                    Ok(LogMessage::Formatted(text)) => file.write_all(text.as_bytes())?,
                    Ok(LogMessage::Shutdown) | Err(_) => {
                        file.flush()?;
                        break;
                    }
                }
            }

            Ok::<(), anyhow::Error>(())
        });

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// `[HH:MM:SS] ` of the simulated clock, empty outside simulation.
    pub fn timestamp_prefix() -> String {
        if !(crate::time_source::is_initialized() && crate::time_source::is_simulated()) {
            return String::new();
        }

        let now = crate::time_source::now();
        match LOCATION_TIMEZONE.get() {
            Some(tz) => format!("[{}] ", now.with_timezone(tz).format("%H:%M:%S")),
            None => format!("[{}] ", now.format("%H:%M:%S")),
        }
    }
}

/// Flushes and joins the file writer thread on drop.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Write an already formatted chunk to the active sink.
pub fn write_output(text: &str) {
    if let Some(tx) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

/// Emit one log line: `lead` is the decoration, `spaced` adds a `┃` line above it.
#[doc(hidden)]
pub fn emit(lead: &str, message: &str, spaced: bool) {
    if !Log::is_enabled() {
        return;
    }
    let prefix = Log::timestamp_prefix();
    let mut formatted = String::new();
    if spaced {
        formatted.push_str(&prefix);
        formatted.push_str("┃\n");
    }
    formatted.push_str(&prefix);
    formatted.push_str(lead);
    formatted.push_str(message);
    formatted.push('\n');
    write_output(&formatted);
}

// # Logging Macros

#[macro_export]
macro_rules! log_decorated {
    ($($arg:tt)*) => {
        $crate::logger::emit("┣ ", &format!($($arg)*), false)
    };
}

#[macro_export]
macro_rules! log_indented {
    ($($arg:tt)*) => {
        $crate::logger::emit("┃   ", &format!($($arg)*), false)
    };
}

#[macro_export]
macro_rules! log_pipe {
    () => {
        $crate::logger::emit("┃", "", false)
    };
}

#[macro_export]
macro_rules! log_block_start {
    ($($arg:tt)*) => {
        $crate::logger::emit("┣ ", &format!($($arg)*), true)
    };
}

#[macro_export]
macro_rules! log_version {
    () => {
        $crate::logger::emit(
            "┏ qiyam v",
            &format!("{} ━━╸", env!("CARGO_PKG_VERSION")),
            false,
        )
    };
}

#[macro_export]
macro_rules! log_end {
    () => {
        $crate::logger::emit("╹", "", false)
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::logger::emit("┣[\x1b[33mWARNING\x1b[0m] ", &format!($($arg)*), false)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::emit("┣[\x1b[31mERROR\x1b[0m] ", &format!($($arg)*), false)
    };
}

/// Error that terminates the flow: spacer, then a closing corner.
#[macro_export]
macro_rules! log_error_exit {
    ($($arg:tt)*) => {
        $crate::logger::emit("┗[\x1b[31mERROR\x1b[0m] ", &format!($($arg)*), true)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::emit("┣[\x1b[32mINFO\x1b[0m] ", &format!($($arg)*), false)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::logger::Log::is_debug() {
            $crate::logger::emit("┣[\x1b[36mDEBUG\x1b[0m] ", &format!($($arg)*), false)
        }
    };
}

#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)*) => {
        $crate::logger::emit("┣[\x1b[31mCRITICAL\x1b[0m] ", &format!($($arg)*), false)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_codes_removes_color_sequences() {
        let colored = "┣[\x1b[33mWARNING\x1b[0m] short window";
        assert_eq!(strip_ansi_codes(colored), "┣[WARNING] short window");
    }

    #[test]
    fn test_strip_ansi_codes_keeps_lone_escape() {
        assert_eq!(strip_ansi_codes("a\x1bb"), "a\x1bb");
    }
}
