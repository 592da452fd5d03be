//! Test logging setup shared by the integration tests.
//!
//! Logs are captured by the test harness and only shown on failure.

use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Initialize test logging. Safe to call from every test; only the first
/// call takes effect.
///
/// Set `RUST_LOG=rubichan_core=debug` to see detailed logs in test output.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rubichan_core=debug"));

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_level(true)
                    .with_target(true)
                    .compact(),
            )
            .with(filter)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_test_logging();
        init_test_logging();
    }
}
