//! Optional Prometheus exporter. Metric emission elsewhere in the crate is
//! guarded by [`prometheus_enabled`] so an unconfigured run pays nothing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use tracing::info;

static EXPORTER: OnceCell<()> = OnceCell::new();
static PROMETHEUS_ENABLED: AtomicBool = AtomicBool::new(false);

/// Installs the exporter once for the given listen address. Subsequent calls
/// are no-ops.
pub fn init_prometheus(listen: &str) -> Result<()> {
    EXPORTER
        .get_or_try_init(|| {
            let addr: SocketAddr = listen
                .parse()
                .with_context(|| format!("invalid prometheus listen address: {listen}"))?;
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()
                .context("failed to install prometheus exporter")?;
            PROMETHEUS_ENABLED.store(true, Ordering::Relaxed);
            info!(target: "monitoring", %addr, "prometheus exporter listening");
            Ok(())
        })
        .map(|_| ())
}

pub fn prometheus_enabled() -> bool {
    PROMETHEUS_ENABLED.load(Ordering::Relaxed)
}
