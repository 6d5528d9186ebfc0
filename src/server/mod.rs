// APIMAN - Support Server Module
// HTTP service for the chat widget, operator dashboard and usage ingestion

mod handlers;
mod middleware;
mod session;

pub use handlers::{create_router, health_check, metrics_endpoint, AppError};
pub use middleware::require_admin_token;
pub use session::{Banner, SessionManager, SessionState};

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::keys::KeyVault;
use crate::metrics::ServiceMetrics;
use crate::notify::Notifier;
use crate::providers::LlmProvider;
use crate::router::QueryRouter;
use crate::storage::{ApiKeyStore, DocumentStore, TicketStore, UsageStore, UserStore};
use crate::tickets::TicketDesk;
use crate::users::UserRegistry;

/// Shared state behind every request
pub struct SupportServer {
    router: QueryRouter,
    desk: TicketDesk,
    keys: KeyVault,
    users: UserRegistry,
    usage: Arc<dyn UsageStore>,
    metrics: ServiceMetrics,
    session_manager: SessionManager,
    admin_token: Option<String>,
    bind_address: String,
    started_at: Instant,
}

impl SupportServer {
    /// Wire the service around one document store. Must run inside a tokio runtime.
    pub fn new<S>(
        config: &Config,
        store: Arc<S>,
        llm: Arc<dyn LlmProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self>
    where
        S: DocumentStore + 'static,
    {
        let metrics = ServiceMetrics::new()?;
        let tickets: Arc<dyn TicketStore> = store.clone();
        let keys: Arc<dyn ApiKeyStore> = store.clone();
        let users: Arc<dyn UserStore> = store.clone();
        let usage: Arc<dyn UsageStore> = store;

        let desk = TicketDesk::new(tickets, notifier, metrics.clone());
        let router = QueryRouter::new(llm, desk.clone(), metrics.clone())
            .with_history_window(config.history_window)
            .with_temperature(config.llm.temperature);
        let session_manager = SessionManager::new(
            config.server.max_sessions,
            config.server.session_timeout_minutes,
        );

        Ok(Self {
            router,
            desk,
            keys: KeyVault::new(keys),
            users: UserRegistry::new(users),
            usage,
            metrics,
            session_manager,
            admin_token: config.server.admin_token.clone(),
            bind_address: config.server.bind_address.clone(),
            started_at: Instant::now(),
        })
    }

    /// Serve HTTP until Ctrl-C
    pub async fn serve(self) -> Result<()> {
        let addr: SocketAddr = self
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.bind_address))?;

        let app = create_router(Arc::new(self));

        tracing::info!("Starting APIMAN support server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }

    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    pub fn desk(&self) -> &TicketDesk {
        &self.desk
    }

    pub fn keys(&self) -> &KeyVault {
        &self.keys
    }

    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    pub fn usage(&self) -> &Arc<dyn UsageStore> {
        &self.usage
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    pub fn session_manager(&self) -> &SessionManager {
        &self.session_manager
    }

    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
