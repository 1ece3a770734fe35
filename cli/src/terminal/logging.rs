use colored::*;
use indicatif::ProgressStyle;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::terminal::print::PRINT_TARGET;
use crate::terminal::spinner;

/// Renders events with a one-symbol status prefix. Lines emitted by the
/// print module are written verbatim.
pub struct FathomFormatter;

impl<S, N> FormatEvent<S, N> for FathomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();

        let mut fields = Fields::default();
        event.record(&mut fields);

        if meta.target() == PRINT_TARGET {
            return writeln!(writer, "{}", fields.raw_msg.unwrap_or_default());
        }

        let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) = match *meta.level() {
            Level::TRACE => ("[ ]", |s| s.dimmed()),
            Level::DEBUG => ("[?]", |s| s.blue()),
            Level::INFO => ("[+]", |s| s.green().bold()),
            Level::WARN => ("[*]", |s| s.yellow().bold()),
            Level::ERROR => ("[-]", |s| s.red().bold()),
        };

        write!(writer, "{} ", color_func(symbol.into()))?;

        if fields.success {
            let message = fields.message.unwrap_or_default();
            return writeln!(writer, "{}", message.green());
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

#[derive(Default)]
struct Fields {
    raw_msg: Option<String>,
    message: Option<String>,
    success: bool,
}

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "raw_msg" => self.raw_msg = Some(value.to_string()),
            "status" => self.success = value == "success",
            "message" => self.message = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{value:?}")),
            "raw_msg" => self.raw_msg = Some(format!("{value:?}")),
            _ => {}
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the flags.
pub fn init_logging(verbose: u8, quiet: u8) {
    let level = match (quiet, verbose) {
        (q, _) if q > 1 => "error",
        (1, _) => "warn",
        (_, 0) => "info",
        (_, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},{PRINT_TARGET}=info")));

    let indicatif_layer =
        IndicatifLayer::new().with_progress_style(spinner::style().unwrap_or_else(|_| {
            ProgressStyle::default_spinner()
        }));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(FathomFormatter)
                .with_writer(indicatif_layer.get_stderr_writer()),
        )
        .with(indicatif_layer)
        .init();
}
