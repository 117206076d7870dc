//! Diagnostic log output.
//!
//! The library reports diagnostics through the `log` facade. The binary
//! installs a `tracing-subscriber` formatter that also receives `log`
//! records and writes one tagged line per event to stderr:
//!
//! ```text
//! [DEBUG] wrote 171 bytes to /etc/apt/sources.list.d/kali.list
//! ```
//!
//! Records from dependencies are only shown at `trace`.

use log::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Log target of this crate's own records.
const CRATE_TARGET: &str = "repo_integrator";

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

/// Writes each event as `[LEVEL] message`.
struct TaggedFormatter;

impl<S, N> FormatEvent<S, N> for TaggedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let tag = match *event.metadata().level() {
            Level::TRACE => "[TRACE]",
            Level::DEBUG => "[DEBUG]",
            Level::INFO => "[INFO]",
            Level::WARN => "[WARN]",
            Level::ERROR => "[ERROR]",
        };
        writeln!(writer, "{tag} {}", visitor.message.unwrap_or_default())
    }
}

/// Builds the filter directives for `level`.
///
/// Below `trace` only this crate's records pass.
fn filter_directives(level: LevelFilter) -> String {
    match level {
        LevelFilter::Off => "off".to_owned(),
        LevelFilter::Trace => "trace".to_owned(),
        other => format!("{CRATE_TARGET}={}", other.as_str().to_ascii_lowercase()),
    }
}

fn subscriber<W>(level: LevelFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter_directives(level)))
        .event_format(TaggedFormatter)
        .with_writer(writer)
        .finish()
}

/// Installs the stderr subscriber with the given maximum level and routes
/// `log` records into it.
///
/// # Errors
///
/// Returns an error if a global subscriber or logger has already been
/// installed.
pub fn init(level: LevelFilter) -> Result<(), TryInitError> {
    subscriber(level, std::io::stderr).try_init()
}
