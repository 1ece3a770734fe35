use std::future::Future;

use indicatif::ProgressStyle;
use indicatif::style::TemplateError;
use tracing::{Instrument, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

pub fn style() -> Result<ProgressStyle, TemplateError> {
    Ok(ProgressStyle::with_template("{spinner:.blue} {msg}")?.tick_strings(TICKS))
}

/// Shows a spinner with `message` while `task` runs.
pub async fn spin<F: Future>(message: &str, task: F) -> F::Output {
    let span = info_span!("task", indicatif.pb_show = true);
    span.pb_set_message(message);
    task.instrument(span).await
}
