//! REST API implementation
//!
//! HTTP surface over the URL registry. Every route except `/health` requires an access
//! token in the `Authorization` header.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;

use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::IdentityVerifier;
use crate::error::Result;
use crate::registry::UrlRegistry;

/// HTTP API server
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(registry: Arc<UrlRegistry>, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            state: AppState { registry, verifier },
        }
    }

    /// Start the HTTP server and run until `shutdown` resolves
    pub async fn serve(
        self,
        addr: &str,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let app = create_router(self.state)
            .layer(TraceLayer::new_for_http())
            .layer(cors);

        let listener = TcpListener::bind(addr).await?;

        info!("HTTP server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
