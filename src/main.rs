use std::sync::Arc;

use anyhow::Context;
use tinyurl::{
    config::AppConfig,
    db,
    diagnostics::TracingDiagnostics,
    logging,
    probe::{HttpProbe, OriginProbe, SkipProbe},
    router, AppState, UrlStore,
};

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env; a missing file is fine since env vars may already be set
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    logging::init(&config)?;
    tracing::info!("Starting tinyurl on {}", config.bind_addr());

    // Open SQLite connection pool, creating the file if needed
    let pool = db::connect(&config.database_url, config.max_connections)
        .await
        .with_context(|| format!("opening database '{}'", config.database_url))?;

    let store =
        UrlStore::new(pool, Arc::new(TracingDiagnostics)).with_options(config.store_options());
    store.bootstrap().await?;
    tracing::info!("Database ready at {}", config.database_url);

    let probe: Arc<dyn OriginProbe> = if config.probe_origins {
        Arc::new(HttpProbe::new(config.probe_timeout).context("building the origin probe client")?)
    } else {
        tracing::warn!("Origin reachability checks are disabled");
        Arc::new(SkipProbe)
    };

    let bind_addr = config.bind_addr();
    let state = Arc::new(AppState {
        store,
        config,
        probe,
    });

    // ── Serve ──────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;

    Ok(())
}
