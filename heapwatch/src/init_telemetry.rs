use anyhow::Result;
use tracing::{debug, Subscriber};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, time::SystemTime},
    layer::SubscriberExt,
    registry::LookupSpan,
    EnvFilter, Layer,
};

const DEFAULT_DIRECTIVES: &str = "warn,heapwatch=info,heapwatch_core=info,heapdump=info";

/// Compact single-line output in debug builds, the full format otherwise.
pub fn build_logger_text<S>() -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer().with_timer(SystemTime).with_target(true);

    if cfg!(debug_assertions) {
        layer
            .with_line_number(false)
            .with_thread_names(false)
            .with_span_events(FmtSpan::NONE)
            .event_format(fmt::format().compact())
            .boxed()
    } else {
        layer.boxed()
    }
}

/// `RUST_LOG` wins when set and valid; otherwise heapwatch logs at info and
/// everything else at warn.
pub fn build_loglevel_filter_layer() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

pub fn init_telemetry_and_tracing() -> Result<()> {
    let subscriber = tracing_subscriber::registry()
        .with(build_loglevel_filter_layer())
        .with(build_logger_text());
    tracing::subscriber::set_global_default(subscriber)?;

    debug!("Logging initialised");
    Ok(())
}
