use crate::error::RpcResult;
use crate::handlers::{query_document, submit_document};
use crate::service::DocumentService;

use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Default address of the HTTP service
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

pub struct RpcServer {
    service: DocumentService,
}

impl RpcServer {
    pub fn new(service: DocumentService) -> Self {
        Self { service }
    }

    /// Routes: `POST /documents` and `GET /documents/{id}`
    pub fn router(&self) -> Router {
        Router::new()
            .route("/documents", post(submit_document))
            .route("/documents/{id}", get(query_document))
            .with_state(self.service.clone())
    }

    /// Bind `address` and serve until `shutdown` is cancelled
    pub async fn serve(self, address: SocketAddr, shutdown: CancellationToken) -> RpcResult<()> {
        let listener = TcpListener::bind(address).await?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` is cancelled
    pub async fn serve_listener(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> RpcResult<()> {
        let address = listener.local_addr()?;
        tracing::info!("hyperion server listening on http://{}", address);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
            })
            .await?;

        tracing::info!("hyperion server stopped");
        Ok(())
    }
}
