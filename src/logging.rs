use colored::*;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

/// A tracing event formatter for terminal output of an analysis run.
///
/// Each line is colored by level. Warnings and errors get a short prefix so
/// that reduced-output conditions (missing timers, negative residuals) stand
/// out among the progress messages; other levels print the message only.
pub struct ColorizedFormatter;

impl ColorizedFormatter {
    fn prefix(level: Level) -> &'static str {
        match level {
            Level::WARN => "warning: ",
            Level::ERROR => "error: ",
            _ => "",
        }
    }
}

impl<S, N> FormatEvent<S, N> for ColorizedFormatter
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
        let level = *event.metadata().level();

        // format_fields writes directly, so buffer the line to color it whole
        let mut buffer = String::from(Self::prefix(level));
        let mut buf_writer = Writer::new(&mut buffer);
        ctx.format_fields(buf_writer.by_ref(), event)?;

        let colored_output = match level {
            Level::INFO => buffer.normal(),
            Level::WARN => buffer.yellow(),
            Level::ERROR => buffer.red().bold(),
            Level::DEBUG => buffer.blue(),
            Level::TRACE => buffer.purple(),
        };

        writeln!(writer, "{}", colored_output)
    }
}

/// Install the global subscriber for the command-line tool
///
/// `RUST_LOG` takes precedence; otherwise `verbose` selects `debug` over `info`.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(ColorizedFormatter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix() {
        assert_eq!(ColorizedFormatter::prefix(Level::WARN), "warning: ");
        assert_eq!(ColorizedFormatter::prefix(Level::ERROR), "error: ");
        assert_eq!(ColorizedFormatter::prefix(Level::INFO), "");
    }
}
