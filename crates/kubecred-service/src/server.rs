//! Store wiring, middleware and the HTTP server loop.

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use kubecred_core::WorkerIdentity;
use kubecred_credentials::{CredentialIssuer, CredentialVerifier};
use kubecred_store::{CredentialStore, MemoryStore, RocksStore};

use crate::api;
use crate::config::{CorsConfig, ServiceConfig, ServiceKind, StoreBackend};

/// Open the store for `kind`.
///
/// The issuance service owns the RocksDB database; the verification service
/// reads it through a secondary instance.
pub fn open_store(config: &ServiceConfig, kind: ServiceKind) -> anyhow::Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; records are lost on exit");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Rocksdb => match kind {
            ServiceKind::Issuance => Arc::new(RocksStore::open(
                &config.store.db_path(),
                config.store.lock_timeout(),
            )?),
            ServiceKind::Verification => Arc::new(RocksStore::open_secondary(
                &config.store.db_path(),
                &config.store.secondary_path(kind),
            )?),
        },
    };
    Ok(store)
}

/// Build the CORS layer from the allowed origins.
pub fn cors_layer(cors: &CorsConfig) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if cors.allowed_origins.is_empty() || cors.allowed_origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }

    let origins = cors
        .allowed_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| anyhow::anyhow!("invalid CORS origin '{}': {}", o, e))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(layer.allow_origin(origins))
}

/// Assemble the router for `kind` over `store`, with middleware.
pub fn build_app(
    kind: ServiceKind,
    config: &ServiceConfig,
    store: Arc<dyn CredentialStore>,
) -> anyhow::Result<Router> {
    let workers = WorkerIdentity::from_config(config.worker.id.clone());
    let router = match kind {
        ServiceKind::Issuance => {
            api::issuance::build_router(Arc::new(CredentialIssuer::new(store, workers)))
        }
        ServiceKind::Verification => {
            api::verification::build_router(Arc::new(CredentialVerifier::new(store, workers)))
        }
    };
    Ok(router
        .layer(cors_layer(&config.cors)?)
        .layer(TraceLayer::new_for_http()))
}

/// Run the `kind` service until Ctrl-C, then close the store.
pub async fn serve(kind: ServiceKind, config: ServiceConfig) -> anyhow::Result<()> {
    let store = open_store(&config, kind)?;
    let app = build_app(kind, &config, store.clone())?;

    let listen_addr: SocketAddr = config.listen_addr(kind).parse()?;
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(
        %listen_addr,
        service = kind.name(),
        worker = config.worker.id.as_deref().unwrap_or("dev"),
        "service started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await?;
    tracing::info!(service = kind.name(), "service exited cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    tracing::info!("received shutdown signal");
}
