//! ringd — token ring node daemon.
//!
//! Usage: `ringd [config.toml]`. Without an argument the config is looked
//! up via $RING_CONFIG or the XDG config directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use ring_core::config::RingConfig;
use ring_services::JsonlEventLog;
use ringd::{bind_udp, RingNode};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(RingConfig::file_path);
    if let Err(e) = RingConfig::write_default_if_missing(&config_path) {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = RingConfig::load_from(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let identity = config.identity().context("invalid configuration")?;

    tracing::info!(
        node = identity.id(),
        ring = ?identity.ring().members(),
        bind = %identity.bind_addr(),
        relay = %config.node.relay,
        "ringd starting"
    );

    // Bind. A node that cannot bind cannot take part in the ring.
    let socket = bind_udp(identity.bind_addr()).context("failed to bind node socket")?;

    // Event log
    let events_path = config.events_path();
    let events = JsonlEventLog::open(&events_path).context("failed to open event log")?;
    tracing::info!(path = %events.path().display(), "event log ready");

    let node = RingNode::new(
        identity,
        config.node.relay,
        config.timing.clone(),
        socket,
        Arc::new(events),
    )
    .with_hold_sends(&config.on_hold);

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Run until shutdown or a fatal node error ─────────────────────────────
    let result = node.run(shutdown_rx).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "ring node failed");
    }
    drop(shutdown_tx);
    result
}
