//! Logging setup
//!
//! Console output uses the regular `tracing_subscriber` formatter. The flat
//! log file gets one line per event in the form
//! `[YYYY-MM-DD HH:MM:SS][LEVEL] message key=value`.

use crate::{Error, Result};
use std::fmt;
use std::path::Path;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "xkmini_web=info,xkmini_common=info,tower_http=info";

/// Event formatter for the flat log file
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatLineFormat;

impl<S, N> FormatEvent<S, N> for FlatLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        write!(writer, "[{}][{}] ", now, event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Build the append-only file layer
///
/// The returned guard flushes buffered lines when dropped and must live as
/// long as logging is needed.
pub fn file_layer<S>(path: &Path) -> Result<(impl Layer<S>, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Config(format!("Log path has no file name: {}", path.display())))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .event_format(FlatLineFormat);

    Ok((layer, guard))
}

/// Install the global subscriber: env filter, console output and log file
pub fn init_logging(log_file: &Path) -> Result<WorkerGuard> {
    let (file, guard) = file_layer(log_file)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing::{error, info};

    #[test]
    fn test_file_lines_use_flat_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("app.log");

        let (layer, guard) = file_layer(&path).unwrap();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            info!("Requesting comic 42");
            error!(trace_id = "abc123", "Favorites endpoint error");
        });
        drop(guard);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        // [YYYY-MM-DD HH:MM:SS][LEVEL] ...
        assert_eq!(&lines[0][0..1], "[");
        assert_eq!(&lines[0][20..22], "][");
        assert!(lines[0].ends_with("[INFO] Requesting comic 42"));
        assert!(lines[1].contains("[ERROR] Favorites endpoint error"));
        assert!(lines[1].contains("trace_id=\"abc123\""));
    }

    #[test]
    fn test_file_is_appended_not_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "[2020-01-01 00:00:00][INFO] earlier\n").unwrap();

        let (layer, guard) = file_layer(&path).unwrap();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || info!("later"));
        drop(guard);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[2020-01-01 00:00:00][INFO] earlier\n"));
        assert!(content.trim_end().ends_with("[INFO] later"));
    }
}
