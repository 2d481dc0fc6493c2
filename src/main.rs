use std::env;
use std::sync::Arc;

use exchange_rates_indexer::{
    build_router,
    config::RatesConfig,
    jobs::rates_sync::{start_rates_sync_job, RatesSyncSettings},
    services::{
        contracts::AlloyChainReader, db_store::SeaOrmRateStore, indexer::RatesIndexer,
        rate_events::RateEventSource, rate_store::RateStore,
    },
    AppState,
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,exchange_rates_indexer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Arc::new(RatesConfig::from_env()?);

    // Connect to database
    let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let store: Arc<dyn RateStore> = Arc::new(SeaOrmRateStore::new(db.clone()));

    match env::var("ETH_RPC_URL") {
        Ok(rpc_url) => {
            let chain = AlloyChainReader::new(&rpc_url).await?;
            let settings = RatesSyncSettings::from_env();
            let source = RateEventSource::new(
                chain.provider().clone(),
                settings.exchange_rates.clone(),
                config.aggregators(),
            );
            let indexer = RatesIndexer::new(store.clone(), Arc::new(chain), config.clone());
            start_rates_sync_job(db.clone(), indexer, source, settings).await;
        }
        Err(_) => {
            tracing::warn!("ETH_RPC_URL not set - rates sync disabled");
        }
    }

    let app = build_router(AppState { store });

    // Start server
    let addr = env::var("SERVER_ADDR").unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
