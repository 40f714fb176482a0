//! Shared helpers for test code across the workspace.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]

use std::sync::Once;

static LOG_SETUP: Once = Once::new();

/// Enables `tracing` output in tests, controlled by the `LOG_FILTER`
/// environment variable. Safe to call from every test; only the first
/// call installs the subscriber.
pub fn maybe_start_logging() {
    LOG_SETUP.call_once(|| {
        let filter = std::env::var("LOG_FILTER").unwrap_or_else(|_| "warn".to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Asserts that `$e` matches the error variant described by `$pat`,
/// printing the actual value on mismatch.
#[macro_export]
macro_rules! assert_error {
    ($e:expr, $pat:pat) => {
        match $e {
            $pat => {}
            other => panic!("expected {}, got: {:?}", stringify!($pat), other),
        }
    };
}
