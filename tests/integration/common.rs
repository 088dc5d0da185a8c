use std::sync::Once;

use sdata::ClientConfig;
use std::time::Duration;

static TRACING: Once = Once::new();

/// Install a test subscriber once. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A configuration with a short timeout and the given retry budget.
pub fn fast_config(timeout_ms: u64, retries: u32) -> ClientConfig {
    ClientConfig::builder()
        .with_timeout(Duration::from_millis(timeout_ms))
        .with_timeout_retry_attempts(retries)
        .build()
}
