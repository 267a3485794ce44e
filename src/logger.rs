use ansi_term::Colour;
use chrono_tz::Tz;
use env_logger::{Builder, Env};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::server::logging::ACCESS_TARGET;

/// Installs the global logger. Console output is coloured; when `log_file`
/// is given every line is also appended there without colours. `RUST_LOG`
/// overrides the default `info` filter.
pub fn init(log_file: Option<&Path>, timezone: Tz) -> Result<()> {
    let log_file = log_file.map(open_log_file).transpose()?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .format(move |buf, record| {
            let timestamp = chrono::Utc::now()
                .with_timezone(&timezone)
                .format("%Y-%m-%dT%H:%M:%S%:z");

            let level = match record.level() {
                log::Level::Error => Colour::Red.paint(record.level().to_string()),
                log::Level::Warn => Colour::Yellow.paint(record.level().to_string()),
                log::Level::Info => Colour::Green.paint(record.level().to_string()),
                log::Level::Debug => Colour::Blue.paint(record.level().to_string()),
                log::Level::Trace => Colour::Purple.paint(record.level().to_string()),
            };

            if let Some(mut file) = log_file.as_ref() {
                // File sink errors are ignored.
                let _ = writeln!(
                    file,
                    "[{} {} {}] {}",
                    timestamp,
                    record.level(),
                    source(record),
                    record.args()
                );
            }

            writeln!(
                buf,
                "[{} {} {}] {}",
                timestamp,
                level,
                source(record),
                record.args()
            )
        })
        .try_init()?;

    Ok(())
}

/// Module path of the call site; access lines are labelled by their target.
fn source<'a>(record: &'a log::Record<'_>) -> &'a str {
    if record.target() == ACCESS_TARGET {
        return ACCESS_TARGET;
    }
    record.module_path().unwrap_or_else(|| record.target())
}

fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Error::OpenLogFile {
            path: path.to_path_buf(),
            source,
        })
}
