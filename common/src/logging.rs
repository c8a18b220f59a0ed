use chrono::{DateTime, Datelike, Local, Timelike};
use log::Record;
use std::fmt::Arguments;
use thiserror::Error;

pub const DEFAULT_FORMAT: &str = "[$Y-$m-$D $H:$M $LEVEL] $MESSAGE";

// Longest first: `$M` is a prefix of `$MESSAGE`.
const TOKENS: [&str; 9] = [
    "$MESSAGE", "$TARGET", "$LEVEL", "$Y", "$m", "$D", "$H", "$M", "$S",
];

#[derive(Error, Debug)]
pub enum LogError {
    #[error("IO Error.")]
    IOError(#[from] std::io::Error),

    #[error("Logger initialization error.")]
    SetLoggerError(log::SetLoggerError),
}

impl LogError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            LogError::IOError(err) => Some(err.to_string()),
            LogError::SetLoggerError(err) => Some(err.to_string()),
        }
    }
}

/// `<title>_<YYYY-MM-DD>.log`, spaces in the title replaced with dashes.
pub fn generate_file_name(title: &str) -> String {
    let now = Local::now();
    let title_formatted = title.trim().replace(" ", "-");

    format!(
        "{title_formatted}_{year:04}-{month:02}-{day:02}.log",
        year = now.year(),
        month = now.month(),
        day = now.day(),
    )
}

/// Renders a record with the `$Y $m $D $H $M $S $LEVEL $TARGET $MESSAGE` mini-language.
pub fn parse_format(format: &str, message: &Arguments, record: &Record) -> String {
    render(
        format,
        Local::now(),
        record.level().as_str(),
        record.target(),
        &message.to_string(),
    )
}

fn render(
    format: &str, time: DateTime<Local>, level: &str, target: &str, message: &str,
) -> String {
    let format = format.trim();
    let mut log = String::with_capacity(format.len() + message.len());
    let mut rest = format;

    while let Some(position) = rest.find('$') {
        log.push_str(&rest[..position]);
        rest = &rest[position..];

        match TOKENS.iter().find(|token| rest.starts_with(*token)) {
            Some(token) => {
                match *token {
                    "$MESSAGE" => log.push_str(message),
                    "$TARGET" => log.push_str(target),
                    "$LEVEL" => log.push_str(level),
                    "$Y" => log.push_str(&format!("{:0>4}", time.year())),
                    "$m" => log.push_str(&format!("{:0>2}", time.month())),
                    "$D" => log.push_str(&format!("{:0>2}", time.day())),
                    "$H" => log.push_str(&format!("{:0>2}", time.hour())),
                    "$M" => log.push_str(&format!("{:0>2}", time.minute())),
                    _ => log.push_str(&format!("{:0>2}", time.second())),
                }
                rest = &rest[token.len()..];
            },
            None => {
                log.push('$');
                rest = &rest[1..];
            },
        }
    }
    log.push_str(rest);

    log
}
