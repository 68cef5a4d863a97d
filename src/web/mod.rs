//! Web layer module
//!
//! Thin axum handlers over the data mapping service and the exporter.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /status` | [`api::status`] |
//! | `POST /file/:user/upload` | [`api::upload_file`] |
//! | `POST /file/:user/map` | [`api::map_file`] |
//! | `POST /file/:user/validate` | [`api::validate_mapping`] |
//! | `POST /file/:user/import` | [`api::import_file`] |

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use crate::{
    config::Config,
    data_mapping::DataMappingService,
    errors::AppResult,
    export::Exporter,
    services::{UsageTracker, WebhookNotifier},
    storage::FileStore,
};

pub mod api;
pub mod extractors;
pub mod responses;
pub mod utils;

pub use extractors::RequestContext;
pub use responses::{handle_error, ApiResponse};

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &Config, state: AppState) -> Result<Self> {
        let app = create_router(state, config.web.max_upload_bytes);
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        Ok(Self { app, addr })
    }

    /// Start the web server
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    /// Get the host address
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Build the router with all routes and middleware
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/status", get(api::status))
        .route("/file/:user/upload", post(api::upload_file))
        .route("/file/:user/map", post(api::map_file))
        .route("/file/:user/validate", post(api::validate_mapping))
        .route("/file/:user/import", post(api::import_file))
        // Middleware (applied in reverse order)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub data_mapping_service: DataMappingService,
    pub exporter: Exporter,
    pub webhook: WebhookNotifier,
    pub usage: UsageTracker,
}

impl AppState {
    /// Wire every collaborator from the resolved configuration
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let store = FileStore::new(config.storage.data_dir.clone());
        store.ensure_data_dir().await?;

        let usage = UsageTracker::new(&config.usage);
        if let Some(anon_id) = usage.anon_id() {
            debug!(anon_id, "Usage tracker ready");
        }

        Ok(Self {
            data_mapping_service: DataMappingService::new(store.clone()),
            exporter: Exporter::new(config.export.clone(), store),
            webhook: WebhookNotifier::new(config.webhook.url.clone()),
            usage,
        })
    }
}
