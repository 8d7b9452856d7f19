//! HTTP endpoint serving `GET /status`.
//!
//! ```text
//! GET /status  → 200 {"semaforo": "green", "log": ["[08:15:42] State: green", ...]}
//! anything else → 404
//! ```

use std::future::Future;
use std::io;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use semaforo_core::StatusSnapshot;
use tokio::net::TcpListener;
use tracing::info;

use crate::application::status::StatusExporter;

/// Builds the router.  Exposed separately so tests can serve it on any port.
pub fn router(exporter: StatusExporter) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .fallback(not_found)
        .with_state(exporter)
}

/// Serves the status endpoint on `listener` until `shutdown` resolves.
pub async fn serve_status<F>(
    listener: TcpListener,
    exporter: StatusExporter,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("status endpoint listening on http://{addr}/status");
    }
    axum::serve(listener, router(exporter))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn get_status(State(exporter): State<StatusExporter>) -> Json<StatusSnapshot> {
    Json(exporter.snapshot())
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
