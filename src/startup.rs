use crate::build_router;
use crate::config::ServiceConfig;
use crate::error::AppError;
use crate::services::email::{EmailProvider, MockEmailProvider, SmtpProvider};
use crate::services::outbox::OutboxWorker;
use crate::services::{Database, ReceiptService};
use crate::AppState;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: ServiceConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            e
        })?;
        db.run_migrations().await.map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            e
        })?;

        let email: Arc<dyn EmailProvider> = if config.smtp.enabled {
            Arc::new(SmtpProvider::new(config.smtp.clone())?)
        } else {
            tracing::warn!("SMTP disabled; outbox documents will be logged, not sent");
            Arc::new(MockEmailProvider::new())
        };

        let receipts = ReceiptService::new(db.clone(), config.receipts.clone());

        let state = AppState {
            config: config.clone(),
            db: db.clone(),
            receipts: receipts.clone(),
            email: email.clone(),
        };

        let worker = OutboxWorker::new(
            db.clone(),
            receipts,
            email,
            config.outbox.clone(),
            config.receipts.clone(),
        );
        tokio::spawn(worker.run());

        let app = build_router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
