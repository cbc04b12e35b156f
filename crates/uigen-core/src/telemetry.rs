//! Tracing setup for binaries and integration harnesses
//!
//! Library code only emits events; installing a subscriber is left to the
//! embedding program.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor an explicit directive is given
pub const DEFAULT_FILTER: &str = "uigen_core=info,uigen_stream=info,uigen_syntax=warn";

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `directive`, which takes precedence over
/// [`DEFAULT_FILTER`]. Returns `false` if a subscriber was already set.
pub fn init_tracing(directive: Option<&str>, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive.unwrap_or(DEFAULT_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
    };
    installed.is_ok()
}
