//! Logging setup shared by the tests of every coil crate.
//!
//! ```rust,ignore
//! use coil_test_log::test;
//!
//! #[test]
//! fn it_logs() {
//!     log::debug!("visible with RUST_LOG=coil=debug");
//! }
//! ```

use coil_log::TargetsExt;
use log::level_filters::LevelFilter;
use parking_lot::Once;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use coil_test_log_proc_macro::test;

static INITIALIZE: Once = Once::new();

/// Installs the test subscriber. Only the first call in a process has an
/// effect; the generated test wrappers call this before the test body.
#[doc(hidden)]
pub fn initialize() {
    INITIALIZE.call_once(|| {
        let result = tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .with(
                Targets::new()
                    .with_default(LevelFilter::INFO)
                    .with_coil_targets(LevelFilter::DEBUG)
                    .with_env(),
            )
            .try_init();
        // Another harness may have installed a global subscriber already.
        if let Err(error) = result {
            eprintln!("test logging not initialized: {error}");
        }
    });
}
