//! Seller Sync server - main entry point

use anyhow::Result;
use seller_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use seller_server::{
    api::{self, AppState},
    config::Config,
    db,
    features::{
        export::{ExportService, GoogleSheetsClient, PgExportSource},
        seller::{PgImportStore, SellerContext, TracingObserver},
        FeatureState,
    },
    journal::PgErrorJournal,
    marketplace::MarketplaceClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("seller-server")
        .filter_directives("seller_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    info!("Starting Seller Sync server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let db_pool = db::create_pool(&db::DbConfig::from(&config.database)).await?;
    info!("Database connection pool established");

    db::migrate(&db_pool).await?;

    let journal = Arc::new(PgErrorJournal::new(db_pool.clone()));

    let seller = SellerContext {
        marketplace: MarketplaceClient::new(&config.marketplace)?,
        journal: journal.clone(),
        store: Arc::new(PgImportStore::new(db_pool.clone())),
        observer: Arc::new(TracingObserver),
    };

    let export = ExportService::new(
        Arc::new(GoogleSheetsClient::new(&config.sheets)?),
        Arc::new(PgExportSource::new(db_pool.clone())),
        journal,
    );

    let state = AppState {
        db: db_pool,
        features: FeatureState { seller, export },
    };

    let app = api::create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
