//! Helpers shared by the workspace's test binaries.

use std::sync::Once;

pub mod fixtures;

static INIT: Once = Once::new();

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // Another harness may already own the global subscriber.
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(feature = "auto-init")]
mod auto {
    use ctor::ctor;

    #[ctor]
    fn init() {
        super::init_tracing_for_tests();
    }
}
