//! Application startup and lifecycle management.
//!
//! The service runs three things side by side: the HTTP surface
//! (health, metrics, summaries), the trigger dispatcher and, when enabled,
//! the MongoDB change feed that feeds it.

use crate::config::DuesConfig;
use crate::handlers;
use crate::services::{DocumentStore, MongoStore};
use crate::triggers::{ChangeFeed, TriggerDispatcher, TriggerRouter};
use axum::{
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub router: TriggerRouter,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let router = TriggerRouter::new(store.clone());
        Self { store, router }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/organizations/:org_id/dues/:due_id/summary",
            get(handlers::summary::get_summary),
        )
        .route(
            "/organizations/:org_id/dues/:due_id/summary/recompute",
            post(handlers::summary::recompute_summary),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
    dispatcher: TriggerDispatcher,
    change_feed: Option<ChangeFeed>,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: DuesConfig) -> Result<Self, AppError> {
        let store = MongoStore::connect(&config.mongodb.uri, &config.mongodb.database).await?;

        store.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let state = AppState::new(Arc::new(store.clone()));
        let dispatcher =
            TriggerDispatcher::new(config.dispatch.dispatch_config(), state.router.clone());

        let change_feed = if config.dispatch.change_feed_enabled {
            Some(ChangeFeed::new(
                store,
                dispatcher.sender(),
                dispatcher.shutdown_token(),
            ))
        } else {
            tracing::info!("Change feed disabled by configuration");
            None
        };

        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", http_addr, e);
            e
        })?;
        let http_port = http_listener.local_addr()?.port();

        Ok(Self {
            http_port,
            http_listener,
            state,
            dispatcher,
            change_feed,
        })
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        let shutdown = self.dispatcher.shutdown_token();
        let router = build_router(self.state);

        tracing::info!("HTTP server listening on port {}", self.http_port);

        let http_shutdown = shutdown.clone();
        let http_listener = self.http_listener;
        let http_server = async move {
            axum::serve(http_listener, router)
                .with_graceful_shutdown(async move { http_shutdown.cancelled().await })
                .await
        };

        let feed = self.change_feed;
        let change_feed = async move {
            match feed {
                Some(feed) => feed.run().await,
                None => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
            }
        };

        let dispatcher = tokio::spawn(self.dispatcher.run());

        let result = tokio::select! {
            result = http_server => result.map_err(AppError::from),
            result = change_feed => result,
            _ = shutdown_signal() => Ok(()),
        };

        if let Err(e) = &result {
            tracing::error!("Service stopped with error: {}", e);
        }

        shutdown.cancel();
        if let Err(e) = dispatcher.await {
            tracing::error!("Trigger dispatcher task failed: {}", e);
        }

        result
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
