//! Tracing initialisation
//!
//! `RUST_LOG` wins when set; otherwise the filter from [`Settings`] applies.
//! Output goes to stderr so command output on stdout stays machine readable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::settings::Settings;

/// Install the global subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
