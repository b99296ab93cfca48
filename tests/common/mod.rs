// Common test utilities and helpers for the test suite

#![allow(dead_code)]

use std::time::Duration;

use taskweave::{Executor, ExecutorConfig};

/// Executor wide enough for every fan-out in the suite.
pub fn executor() -> Executor {
    Executor::with_config(ExecutorConfig {
        worker_threads: 8,
        shutdown_timeout_ms: 2_000,
        ..ExecutorConfig::default()
    })
    .unwrap()
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[cfg(not(feature = "tracing"))]
pub fn init_tracing() {
    // No-op when tracing is disabled
}
