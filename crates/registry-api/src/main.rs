//! Registry REST API server.

use registry_api::server::{self, AppState};
use registry_core::{
    AuditSink, JsonlAuditSink, NoopAuditSink, Registry, RegistryConfig, RegistryEvent,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RegistryConfig::from_env()?;
    let sink: Arc<dyn AuditSink> = match std::env::var("REGISTRY_AUDIT_PATH") {
        Ok(path) => {
            tracing::info!(path = %path, "audit log mirrored to JSONL");
            Arc::new(JsonlAuditSink::new(path))
        }
        Err(_) => Arc::new(NoopAuditSink),
    };
    tracing::info!(
        admin_id = %config.admin_id,
        max_registrants = ?config.max_registrants,
        reset_scope = %config.reset_scope,
        "registry configured"
    );
    let registry = Arc::new(Registry::new(config).with_sink(sink).restore_audit().await?);

    let mut events = registry.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(RegistryEvent::Registered {
                    owner_id,
                    display_name,
                }) => {
                    tracing::info!(
                        owner_id = %owner_id,
                        display_name = %display_name,
                        "registered"
                    );
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "registration notifications lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let app = server::router(Arc::new(AppState { registry }));
    let addr: SocketAddr = std::env::var("REGISTRY_LISTEN")
        .unwrap_or_else(|_| "0.0.0.0:8002".to_string())
        .parse()?;
    tracing::info!("Registry API listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}
