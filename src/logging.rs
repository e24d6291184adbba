//! Process-wide `tracing` subscriber.
//!
//! An interactive session owns the terminal in raw mode, so its logs go to
//! `<state>/logs/rosary-{datetime}.log` (or nowhere when file logging is
//! off). Every other command logs to stderr.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

pub struct LoggingHandle {
    /// Drop flushes the file writer
    _flush_guard: Option<WorkerGuard>,

    pub log_file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    File { dir: PathBuf, name: String },
    Discard,
    Stderr,
}

fn log_file_name(now: DateTime<Utc>) -> String {
    format!("rosary-{}.log", now.format("%Y%m%dT%H%M%SZ"))
}

fn log_target(config: &Config, is_interactive: bool, now: DateTime<Utc>) -> LogTarget {
    match (is_interactive, config.logging.to_file) {
        (true, true) => LogTarget::File {
            dir: config.logs_path(),
            name: log_file_name(now),
        },
        (true, false) => LogTarget::Discard,
        (false, _) => LogTarget::Stderr,
    }
}

/// Directive used when `RUST_LOG` is unset or unparsable
fn default_directive(config: &Config, debug_override: bool) -> &str {
    if debug_override {
        "debug"
    } else {
        &config.logging.level
    }
}

/// Install the global subscriber. Keep the returned handle alive until exit.
///
/// `RUST_LOG` wins over `--debug`, which wins over the configured level.
pub fn init_logging(
    config: &Config,
    is_interactive: bool,
    debug_override: bool,
) -> Result<LoggingHandle> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config, debug_override)));

    let (writer, flush_guard, log_file_path) = match log_target(config, is_interactive, Utc::now())
    {
        LogTarget::File { dir, name } => {
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::never(&dir, &name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (
                BoxMakeWriter::new(non_blocking),
                Some(guard),
                Some(dir.join(name)),
            )
        }
        LogTarget::Discard => (BoxMakeWriter::new(std::io::sink), None, None),
        LogTarget::Stderr => (BoxMakeWriter::new(std::io::stderr), None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(log_file_path.is_none())
                .with_writer(writer),
        )
        .init();

    Ok(LoggingHandle {
        _flush_guard: flush_guard,
        log_file_path,
    })
}
