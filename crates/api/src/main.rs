use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use tenantdesk_api::middleware::ProxyTrust;
use tenantdesk_auth::TokenService;
use tenantdesk_infra::{AppConfig, InMemoryAuditSink, InMemoryStore, PostgresStore, Services, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tenantdesk_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "configuration loaded");

    let tokens = TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl_secs);
    let services = match &config.database_url {
        Some(url) => {
            let store = Arc::new(
                PostgresStore::connect(url)
                    .await
                    .context("failed to connect to postgres")?,
            );
            Services::new(store.clone(), store, tokens)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is lost on exit)");
            Services::new(
                Arc::new(InMemoryStore::new()),
                Arc::new(InMemoryAuditSink::new()),
                tokens,
            )
        }
    };

    seed::bootstrap(&services, &config)
        .await
        .context("seeding failed")?;

    let app = tenantdesk_api::app::build_app(services, ProxyTrust(config.trust_proxy));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
