//! Process-wide tracing setup. Called once from `main`; library code only
//! emits events.

use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
///
/// A subscriber that is already installed is left in place.
pub fn init_logging(default_level: &str) -> Result<(), SetGlobalDefaultError> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
