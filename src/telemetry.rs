//! Tracing configuration for applications using SandboxAI.

use sandboxai_core::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global tracing subscriber.
///
/// The filter comes from `RUST_LOG` (default `info,sandboxai=debug`).
/// `SANDBOXAI_LOG_FORMAT=json` switches to JSON lines. Returns a
/// configuration error if a global subscriber is already installed.
pub fn configure_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sandboxai=debug".into()),
    );

    let registry = tracing_subscriber::registry().with(env_filter);

    let json = std::env::var("SANDBOXAI_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| Error::configuration(format!("Failed to install tracing subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_an_error() {
        let _ = configure_tracing();
        assert!(matches!(configure_tracing(), Err(Error::Configuration(_))));
    }
}
