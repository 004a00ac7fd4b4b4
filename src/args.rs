//! Command-line argument parsing.
//!
//! `qiyam [OPTIONS] [COMMAND] [ARGS]`. Options may appear anywhere on the
//! line. Without a command the live `watch` loop runs.

/// What the binary should do.
#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    /// Live countdown and window state
    Watch,
    /// One-shot window, schedule and state
    Show { json: bool },
    /// Plain-text summary for sharing
    Summary,
    /// Search places; interactive picker when no query is given
    Search { query: Option<String> },
    /// Approximate location from the system timezone
    Locate,
    /// Update one settings field
    Set { field: String, value: String },
    /// List calculation methods
    Methods,
    /// Watch under a simulated clock
    Simulate {
        start_time: String,
        end_time: String,
        multiplier: f64,
        log_to_file: bool,
    },
    /// Detailed help for one command, or general help
    Help { topic: Option<String> },
    ShowHelp,
    ShowVersion,
    /// Show help due to unknown or invalid arguments, then exit 1
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
#[derive(Debug, PartialEq)]
pub struct ParsedArgs {
    pub action: CliAction,
    pub debug_enabled: bool,
    pub config_dir: Option<String>,
}

/// Default simulation speed: one simulated hour per real second.
pub const DEFAULT_SIMULATION_MULTIPLIER: f64 = 3600.0;

const COMMANDS: [&str; 9] = [
    "watch", "show", "summary", "search", "locate", "set", "methods", "simulate", "help",
];

#[derive(Default)]
struct Flags {
    debug: bool,
    help: bool,
    version: bool,
    json: bool,
    log: bool,
    fast_forward: bool,
    config_dir: Option<String>,
    invalid: bool,
}

fn validate_datetime(s: &str) -> bool {
    s.len() == 19
        && s.chars().nth(4) == Some('-')
        && s.chars().nth(7) == Some('-')
        && s.chars().nth(10) == Some(' ')
        && s.chars().nth(13) == Some(':')
        && s.chars().nth(16) == Some(':')
}

impl ParsedArgs {
    /// Parse arguments, including the program name in first position.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut flags = Flags::default();
        let mut positional: Vec<String> = Vec::new();

        let mut i = 0;
        while i < args_vec.len() {
            let arg = &args_vec[i];
            match arg.as_str() {
                "--debug" | "-d" => flags.debug = true,
                "--help" | "-h" => flags.help = true,
                "--version" | "-V" | "-v" => flags.version = true,
                "--json" => flags.json = true,
                "--log" => flags.log = true,
                "--fast-forward" => flags.fast_forward = true,
                "--config" | "-c" => {
                    if i + 1 < args_vec.len() && !args_vec[i + 1].starts_with('-') {
                        flags.config_dir = Some(args_vec[i + 1].clone());
                        i += 1;
                    } else {
                        log_warning!("Missing directory for --config. Usage: --config <directory>");
                        flags.invalid = true;
                    }
                }
                // Negative numbers are values, e.g. `set location -33.86,151.2`
                other if other.starts_with('-') && other.parse::<f64>().is_err()
                    && !other.contains(',') =>
                {
                    log_warning!("Unknown option: {}", other);
                    flags.invalid = true;
                }
                _ => positional.push(arg.clone()),
            }
            i += 1;
        }

        let action = Self::resolve_action(&flags, &positional);
        ParsedArgs {
            action,
            debug_enabled: flags.debug,
            config_dir: flags.config_dir,
        }
    }

    fn resolve_action(flags: &Flags, positional: &[String]) -> CliAction {
        if flags.version {
            return CliAction::ShowVersion;
        }
        if flags.invalid {
            return CliAction::ShowHelpDueToError;
        }

        let Some((command, rest)) = positional.split_first() else {
            if flags.help {
                return CliAction::ShowHelp;
            }
            return Self::reject_flags(flags, &[], CliAction::Watch);
        };

        let command = match command.as_str() {
            "w" => "watch",
            "s" => "set",
            other => other,
        };

        if !COMMANDS.contains(&command) {
            log_warning!("Unknown command: {}", command);
            return CliAction::ShowHelpDueToError;
        }

        if flags.help {
            return CliAction::Help {
                topic: Some(command.to_string()),
            };
        }

        match command {
            "watch" | "summary" | "locate" | "methods" => {
                if let Some(extra) = rest.first() {
                    log_warning!("Unexpected argument for {}: {}", command, extra);
                    return CliAction::ShowHelpDueToError;
                }
                let action = match command {
                    "watch" => CliAction::Watch,
                    "summary" => CliAction::Summary,
                    "locate" => CliAction::Locate,
                    _ => CliAction::Methods,
                };
                Self::reject_flags(flags, &[], action)
            }
            "show" => {
                if let Some(extra) = rest.first() {
                    log_warning!("Unexpected argument for show: {}", extra);
                    return CliAction::ShowHelpDueToError;
                }
                Self::reject_flags(flags, &["--json"], CliAction::Show { json: flags.json })
            }
            "search" => {
                let query = rest.join(" ");
                let query = (!query.trim().is_empty()).then(|| query.trim().to_string());
                Self::reject_flags(flags, &[], CliAction::Search { query })
            }
            "set" => match rest {
                [field, value] => Self::reject_flags(
                    flags,
                    &[],
                    CliAction::Set {
                        field: field.clone(),
                        value: value.clone(),
                    },
                ),
                _ => {
                    log_warning!("Usage: qiyam set <field> <value>");
                    log_indented!("Example: qiyam set location 51.5074,-0.1278");
                    CliAction::ShowHelpDueToError
                }
            },
            "simulate" => Self::parse_simulate(flags, rest),
            "help" => match rest {
                [] => CliAction::Help { topic: None },
                [topic] => CliAction::Help {
                    topic: Some(topic.clone()),
                },
                _ => CliAction::ShowHelpDueToError,
            },
            _ => CliAction::ShowHelpDueToError,
        }
    }

    /// Flags that only make sense for one command are errors anywhere else.
    fn reject_flags(flags: &Flags, allowed: &[&str], action: CliAction) -> CliAction {
        let used = [
            ("--json", flags.json),
            ("--log", flags.log),
            ("--fast-forward", flags.fast_forward),
        ];
        for (name, set) in used {
            if set && !allowed.contains(&name) {
                log_warning!("Option {} is not valid here", name);
                return CliAction::ShowHelpDueToError;
            }
        }
        action
    }

    fn parse_simulate(flags: &Flags, rest: &[String]) -> CliAction {
        let (start, end, multiplier) = match rest {
            [start, end] => (start, end, None),
            [start, end, multiplier] => (start, end, Some(multiplier)),
            _ => {
                log_warning!(
                    "Usage: qiyam simulate \"YYYY-MM-DD HH:MM:SS\" \"YYYY-MM-DD HH:MM:SS\" [multiplier | --fast-forward] [--log]"
                );
                return CliAction::ShowHelpDueToError;
            }
        };

        for (label, value) in [("start", start), ("end", end)] {
            if !validate_datetime(value) {
                log_error!(
                    "Invalid {} time format: '{}'. Use YYYY-MM-DD HH:MM:SS",
                    label,
                    value
                );
                return CliAction::ShowHelpDueToError;
            }
        }

        let multiplier = match (multiplier, flags.fast_forward) {
            (Some(_), true) => {
                log_error!("Use either a multiplier or --fast-forward, not both");
                return CliAction::ShowHelpDueToError;
            }
            (None, true) => 0.0,
            (None, false) => DEFAULT_SIMULATION_MULTIPLIER,
            (Some(raw), false) => match raw.parse::<f64>() {
                Ok(mult) if (0.1..=3600.0).contains(&mult) => mult,
                _ => {
                    log_error!("Invalid multiplier: {}. Must be between 0.1 and 3600.", raw);
                    return CliAction::ShowHelpDueToError;
                }
            },
        };

        Self::reject_flags(
            flags,
            &["--log", "--fast-forward"],
            CliAction::Simulate {
                start_time: start.clone(),
                end_time: end.clone(),
                multiplier,
                log_to_file: flags.log,
            },
        )
    }

    /// Parse `std::env::args()`.
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("qiyam [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom settings directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("watch, w               Live countdown to the last third (default)");
    log_indented!("show [--json]          Tonight's window, schedule and state");
    log_indented!("summary                Plain-text window summary for sharing");
    log_indented!("search [query]         Find a place and save it as your location");
    log_indented!("locate                 Use the system timezone to pick a location");
    log_indented!("set, s <field> <value> Update a setting");
    log_indented!("methods                List calculation methods");
    log_indented!("simulate <start> <end> Watch with a simulated clock");
    log_indented!("help [command]         Detailed help for a command");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ParsedArgs {
        let mut full = vec!["qiyam"];
        full.extend_from_slice(args);
        ParsedArgs::parse(full)
    }

    #[test]
    fn test_parse_no_args_watches() {
        let parsed = parse(&[]);
        assert_eq!(
            parsed,
            ParsedArgs {
                action: CliAction::Watch,
                debug_enabled: false,
                config_dir: None,
            }
        );
    }

    #[test]
    fn test_parse_debug_and_config_anywhere() {
        let parsed = parse(&["show", "-d", "--config", "/tmp/qiyam-test"]);
        assert_eq!(parsed.action, CliAction::Show { json: false });
        assert!(parsed.debug_enabled);
        assert_eq!(parsed.config_dir.as_deref(), Some("/tmp/qiyam-test"));
    }

    #[test]
    fn test_parse_help_and_version() {
        assert_eq!(parse(&["--help"]).action, CliAction::ShowHelp);
        assert_eq!(parse(&["-h"]).action, CliAction::ShowHelp);
        assert_eq!(parse(&["-V"]).action, CliAction::ShowVersion);
        assert_eq!(
            parse(&["--version", "--help", "--debug"]).action,
            CliAction::ShowVersion
        );
        assert_eq!(
            parse(&["set", "--help"]).action,
            CliAction::Help {
                topic: Some("set".to_string())
            }
        );
    }

    #[test]
    fn test_parse_show_json() {
        assert_eq!(parse(&["show", "--json"]).action, CliAction::Show { json: true });
        assert_eq!(parse(&["summary", "--json"]).action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_search_joins_query_words() {
        assert_eq!(
            parse(&["search", "New", "York"]).action,
            CliAction::Search {
                query: Some("New York".to_string())
            }
        );
        assert_eq!(parse(&["search"]).action, CliAction::Search { query: None });
    }

    #[test]
    fn test_parse_set_with_negative_coordinates() {
        assert_eq!(
            parse(&["set", "location", "-33.8688,151.2093"]).action,
            CliAction::Set {
                field: "location".to_string(),
                value: "-33.8688,151.2093".to_string()
            }
        );
        assert_eq!(parse(&["set", "method"]).action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_simulate() {
        assert_eq!(
            parse(&["simulate", "2025-03-01 20:00:00", "2025-03-02 07:00:00", "60", "--log"])
                .action,
            CliAction::Simulate {
                start_time: "2025-03-01 20:00:00".to_string(),
                end_time: "2025-03-02 07:00:00".to_string(),
                multiplier: 60.0,
                log_to_file: true,
            }
        );
        assert_eq!(
            parse(&["simulate", "2025-03-01 20:00:00", "2025-03-02 07:00:00", "--fast-forward"])
                .action,
            CliAction::Simulate {
                start_time: "2025-03-01 20:00:00".to_string(),
                end_time: "2025-03-02 07:00:00".to_string(),
                multiplier: 0.0,
                log_to_file: false,
            }
        );
        assert_eq!(
            parse(&["simulate", "2025-03-01", "2025-03-02 07:00:00"]).action,
            CliAction::ShowHelpDueToError
        );
        assert_eq!(
            parse(&["simulate", "2025-03-01 20:00:00", "2025-03-02 07:00:00", "9000"]).action,
            CliAction::ShowHelpDueToError
        );
    }

    #[test]
    fn test_unknown_arguments_are_errors() {
        assert_eq!(parse(&["--unknown"]).action, CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["frobnicate"]).action, CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["methods", "extra"]).action, CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["--debug", "--invalid"]).action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_help_topics() {
        assert_eq!(parse(&["help"]).action, CliAction::Help { topic: None });
        assert_eq!(
            parse(&["help", "simulate"]).action,
            CliAction::Help {
                topic: Some("simulate".to_string())
            }
        );
    }
}
