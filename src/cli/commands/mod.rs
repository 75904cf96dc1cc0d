use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

use crate::wsapi::query::SyncLevel;

pub fn validator_sync_level() -> ValueParser {
    ValueParser::from(
        move |sl: &str| -> std::result::Result<SyncLevel, String> {
            if let Ok(parsed) = sl.parse::<u8>() {
                if parsed <= 100 {
                    return Ok(SyncLevel::Percent(parsed));
                }
            }

            match sl.to_lowercase().as_str() {
                "fast" => Ok(SyncLevel::Fast),
                "secure" => Ok(SyncLevel::Secure),
                _ => Err("sync level must be 0-100, \"fast\" or \"secure\"".to_string()),
            }
        },
    )
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("konfirmi")
        .about("Hardware OTP validation client")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("client-id")
                .short('c')
                .long("client-id")
                .help("API client id issued by the validation service")
                .env("KONFIRMI_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new("api-key")
                .short('k')
                .long("api-key")
                .help("Base64 encoded API key; signs requests and verifies response signatures")
                .env("KONFIRMI_API_KEY"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .help("Validation server base URL; repeat to replace the default pool")
                .env("KONFIRMI_HOST")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .help("Per-host connection timeout in seconds")
                .default_value("10")
                .env("KONFIRMI_TIMEOUT")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("max-time-window")
                .short('w')
                .long("max-time-window")
                .help("Maximum elapsed generation time across a chain, in 0.125s ticks")
                .default_value("40")
                .env("KONFIRMI_MAX_TIME_WINDOW")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("sync-level")
                .short('s')
                .long("sync-level")
                .help("Percentage of replicas that must agree: 0-100, \"fast\" or \"secure\"")
                .env("KONFIRMI_SYNC_LEVEL")
                .value_parser(validator_sync_level()),
        )
        .arg(
            Arg::new("otp")
                .help("OTP token(s); two or more are verified as a chain from one device")
                .num_args(1..)
                .required(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("KONFIRMI_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}
