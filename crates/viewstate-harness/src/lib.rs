#![forbid(unsafe_code)]

//! Test harness for `viewstate`.
//!
//! - [`host`]: a minimal host framework that mounts views, renders them, and
//!   flushes dirty views until quiescent.
//! - [`fixtures`]: the reference parent/child link-prop fixture.
//! - [`log_capture`]: a `tracing-subscriber` layer that records events so
//!   tests can assert that rejections were logged.
//!
//! Set `VIEWSTATE_LOG` (an `EnvFilter` directive) and call
//! [`init_test_logging`] to see library logs while debugging a test.

pub mod fixtures;
pub mod host;
pub mod log_capture;

pub use fixtures::{ChildFixture, LinkPropFixture, ParentFixture};
pub use host::{Host, HostedView};
pub use log_capture::{CapturedEvent, LogCapture};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the log filter for [`init_test_logging`].
pub const LOG_ENV: &str = "VIEWSTATE_LOG";

/// Install a global fmt subscriber filtered by [`LOG_ENV`] (default
/// `warn`). Returns `false` if a global subscriber was already set.
pub fn init_test_logging() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer().with_target(true))
        .try_init()
        .is_ok()
}
