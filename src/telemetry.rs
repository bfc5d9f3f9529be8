//! Tracing subscriber installation.

use std::sync::Once;

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global tracing subscriber.
///
/// Filter directives come from the `RAGLINE_LOG` environment variable,
/// defaulting to `info`. Safe to call more than once; only the first call
/// installs anything, and an already-installed global subscriber (e.g. in
/// tests) is left in place.
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env("RAGLINE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .with(ErrorLayer::default())
            .try_init();
    });
}
