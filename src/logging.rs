use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

const DEFAULT_FILTER: &str = "fixture_forecast=info,warn";

static INIT: OnceCell<()> = OnceCell::new();

/// Installs the stderr subscriber once per process. `RUST_LOG` overrides the
/// default filter. Later calls are no-ops.
pub fn init_tracing() -> Result<()> {
    INIT.get_or_try_init(|| {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
            )
            .with_writer(std::io::stderr)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| anyhow!("failed to set tracing subscriber: {e}"))
    })?;
    Ok(())
}
