use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global `tracing` subscriber.
///
/// `structured` selects JSON output for production log shipping; otherwise
/// output is a human-readable line per event. Falls back to `level` when
/// `RUST_LOG` isn't set.
pub fn init_tracing(level: &str, structured: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("strata={},strata_retrieval={}", level, level)));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if structured {
        subscriber
            .with(fmt::layer().json().with_target(false).with_current_span(false))
            .init();
    } else {
        subscriber.with(fmt::layer().with_target(false)).init();
    }
}
