//! Browser console logging.

use passkey_core::{PasskeyError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_wasm::{WASMLayer, WASMLayerConfigBuilder};

/// Parse a `log_filter` directive such as `"info,passkey_core=debug"`.
pub fn build_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| PasskeyError::ConfigError(format!("log filter {filter:?}: {e}")))
}

/// Install the console subscriber.
///
/// Returns `false` if a subscriber was already installed; the first hook on
/// the page wins.
pub fn init(filter: &str) -> Result<bool> {
    let filter = build_filter(filter)?;
    let console = WASMLayer::new(
        WASMLayerConfigBuilder::new()
            .set_report_logs_in_timings(false)
            .build(),
    );

    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .try_init()
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_directives() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("warn,passkey_core=debug").is_ok());
    }

    #[test]
    fn test_build_filter_rejects_bad_level() {
        let err = build_filter("passkey_core=verbose").unwrap_err();
        assert!(matches!(err, PasskeyError::ConfigError(_)));
    }
}
