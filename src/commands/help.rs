//! `help [command]`: detailed help for one command, or the general help.

use anyhow::Result;

pub fn run_help_command(command: Option<&str>) -> Result<()> {
    match command {
        None => crate::args::display_help(),
        Some("watch") | Some("w") => super::watch::display_help(),
        Some("show") => display_show_help(),
        Some("summary") => display_summary_help(),
        Some("search") => display_search_help(),
        Some("locate") => display_locate_help(),
        Some("set") | Some("s") => super::set::display_help(),
        Some("methods") => display_methods_help(),
        Some("simulate") => super::simulate::display_help(),
        Some("help") => display_help_help(),
        Some(unknown) => {
            log_version!();
            log_pipe!();
            log_warning!("Unknown command: {}", unknown);
            log_end!();
            crate::args::display_help();
        }
    }
    Ok(())
}

fn display_show_help() {
    log_version!();
    log_block_start!("show - Tonight's window, state and prayer times");
    log_block_start!("Usage: qiyam show [--json]");
    log_block_start!("Options:");
    log_indented!("--json  Print one JSON document instead of the formatted report");
    log_end!();
}

fn display_summary_help() {
    log_version!();
    log_block_start!("summary - Plain-text window for sharing");
    log_block_start!("Usage: qiyam summary");
    log_block_start!("Description:");
    log_indented!("Prints start, end (Fajr), night duration and the middle of the");
    log_indented!("night, titled with the location when one has been saved.");
    log_end!();
}

fn display_search_help() {
    log_version!();
    log_block_start!("search - Find a place and save it as the location");
    log_block_start!("Usage: qiyam search [place]");
    log_block_start!("Description:");
    log_indented!("With a place name, lists up to five matches and saves the one");
    log_indented!("you pick. Without one, searches as you type once typing pauses.");
    log_block_start!("Examples:");
    log_indented!("qiyam search istanbul");
    log_indented!("qiyam search \"kuala lumpur\"");
    log_end!();
}

fn display_locate_help() {
    log_version!();
    log_block_start!("locate - Detect the location from the system timezone");
    log_block_start!("Usage: qiyam locate");
    log_block_start!("Description:");
    log_indented!("Looks up the city named by the system timezone and saves it.");
    log_indented!("Timezones without a city (UTC, Etc/*) cannot be located.");
    log_end!();
}

fn display_methods_help() {
    log_version!();
    log_block_start!("methods - List calculation methods");
    log_block_start!("Usage: qiyam methods");
    log_block_start!("Description:");
    log_indented!("Lists the provider's methods and marks the configured one.");
    log_indented!("Choose one with 'qiyam set method <id>'.");
    log_end!();
}

fn display_help_help() {
    log_version!();
    log_block_start!("help - Display help information");
    log_block_start!("Usage: qiyam help [command]");
    log_block_start!("Commands:");
    log_indented!("watch, show, summary, search, locate, set, methods, simulate");
    log_end!();
}
