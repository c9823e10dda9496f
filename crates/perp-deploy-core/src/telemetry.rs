//! Tracing setup for the `perp-deploy` binary.
//!
//! Logs always go to stderr: `perp-deploy encode` and the deployment summary
//! print to stdout and are meant to be piped. In JSON mode every line carries
//! the fields of the enclosing run span (`run_id`, `chain_id`), so the lines
//! of one deployment can be grouped without parsing messages.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Transport crates that log every RPC round-trip at debug level.
const NOISY_TARGETS: [&str; 2] = ["ethers_providers", "hyper"];

/// Filter used when `RUST_LOG` is unset: `level` for our crates, warnings
/// only for the RPC transport.
pub fn default_filter(level: Level) -> String {
    let mut directives = vec![level.as_str().to_lowercase()];
    directives.extend(NOISY_TARGETS.iter().map(|target| format!("{target}=warn")));
    directives.join(",")
}

/// `rust_log` when it is set and parses, otherwise [`default_filter`].
pub fn build_filter(rust_log: Option<&str>, level: Level) -> EnvFilter {
    rust_log
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter(level)))
}

/// Install the global subscriber. Only the first call in a process has an
/// effect.
pub fn init_tracing(json: bool, level: Level) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(rust_log.as_deref(), level);

    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .ok();
}
