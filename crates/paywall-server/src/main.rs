use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use paywall_gate::gate::AccessGate;
use paywall_providers::provider::Provider;
use paywall_server::{app::build_app, compaction::run_compaction, settings::Settings, telemetry};
use paywall_store::SqliteAccessStore;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings.log)?;

    let store = SqliteAccessStore::connect(&settings.database.url, settings.database.max_connections)
        .await
        .with_context(|| format!("opening grant database {}", settings.database.url))?;

    // `coinsnap-paywall uninstall` removes the grant table and exits.
    if std::env::args().nth(1).as_deref() == Some("uninstall") {
        store.drop_schema().await?;
        info!("Grant table removed");
        return Ok(());
    }

    let provider = Provider::from_settings(&settings.payments)?;
    let gate = Arc::new(
        AccessGate::builder()
            .provider(provider)
            .store(store.clone())
            .config(settings.gate.gate_config())
            .build(),
    );

    tokio::spawn(run_compaction(
        store,
        gate.pending.clone(),
        Duration::from_secs(settings.gate.prune_interval_secs.max(1)),
        chrono::Duration::hours(i64::from(settings.gate.grant_retention_hours)),
    ));

    let app = build_app(gate);
    let addr = settings.server.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(provider = ?settings.payments.provider, "Paywall listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
