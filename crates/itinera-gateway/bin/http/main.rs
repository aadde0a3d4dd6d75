mod cli;

use crate::cli::{CacheBackendArg, LogFormatArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use itinera_cache::{CacheClient, MemoryKvCache, RedisKvCache};
use itinera_gateway::{App, AppState, GatewayConfig, JwtAuthority};
use itinera_service::{ItineraryService, ServiceSettings};
use itinera_storage::{InMemoryRepository, MySqlRepository};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::try_parse()?;
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        environment = %config.environment,
        storage_backend = %config.storage,
        cache_backend = %config.cache,
        "starting itinerary gateway"
    );

    let cache = match config.cache {
        CacheBackendArg::InMemory => CacheClient::new(MemoryKvCache::new()),
        CacheBackendArg::Redis => CacheClient::new(
            RedisKvCache::open(&config.redis_url).context("invalid redis url")?,
        ),
    }
    .with_timeout(Duration::from_millis(config.cache_timeout_ms));

    let settings = ServiceSettings::builder()
        .store_timeout(Duration::from_millis(config.store_timeout_ms))
        .build();

    let service = match config.storage {
        StorageBackendArg::InMemory => {
            ItineraryService::new(InMemoryRepository::new(), cache, settings)
        }
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let repository = MySqlRepository::connect(dsn)
                .await
                .context("failed to connect to mysql")?;
            repository
                .ensure_schema()
                .await
                .context("failed to create schema")?;
            ItineraryService::new(repository, cache, settings)
        }
    };

    let gateway = GatewayConfig {
        environment: config.environment.into(),
        public_base_url: config.public_base_url,
    };
    let state = AppState::new(service, JwtAuthority::new(&config.jwt_secret), gateway);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gateway stopped");
    Ok(())
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
