//! Command-line entry point.
//!
//! Parses arguments, applies the process-wide options (debug output, custom
//! settings directory) and hands off to the matching command handler.

#[macro_use]
extern crate qiyam;

use anyhow::Result;
use qiyam::QiyamError;
use qiyam::args::{self, CliAction, ParsedArgs};
use qiyam::commands;
use qiyam::config;
use qiyam::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use qiyam::logger::Log;

fn main() {
    let parsed_args = ParsedArgs::from_env();
    Log::set_debug(parsed_args.debug_enabled);

    if parsed_args.action == CliAction::ShowHelpDueToError {
        args::display_help();
        std::process::exit(EXIT_FAILURE);
    }

    if let Err(e) = config::set_config_dir(parsed_args.config_dir.clone()) {
        log_error_exit!("{}", e);
        std::process::exit(EXIT_FAILURE);
    }

    let code = match run(parsed_args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            // Domain errors were already reported by the command
            if e.downcast_ref::<QiyamError>().is_none() {
                Log::set_enabled(true);
                log_error_exit!("{:#}", e);
            }
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}

fn run(parsed_args: ParsedArgs) -> Result<()> {
    let debug_enabled = parsed_args.debug_enabled;

    match parsed_args.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp | CliAction::ShowHelpDueToError => {
            args::display_help();
            Ok(())
        }
        CliAction::Help { topic } => commands::help::run_help_command(topic.as_deref()),
        CliAction::Watch => commands::watch::handle_watch_command(debug_enabled),
        CliAction::Show { json } => commands::show::handle_show_command(json),
        CliAction::Summary => commands::summary::handle_summary_command(),
        CliAction::Search { query } => commands::search::handle_search_command(query),
        CliAction::Locate => commands::locate::handle_locate_command(),
        CliAction::Set { field, value } => commands::set::handle_set_command(&field, &value),
        CliAction::Methods => commands::methods::handle_methods_command(),
        CliAction::Simulate {
            start_time,
            end_time,
            multiplier,
            log_to_file,
        } => commands::simulate::handle_simulate_command(
            &start_time,
            &end_time,
            multiplier,
            log_to_file,
            debug_enabled,
        ),
    }
}
