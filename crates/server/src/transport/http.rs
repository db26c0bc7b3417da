//! HTTP transport for murmur server
//!
//! Serves the routes the service has always exposed:
//!
//! - `POST /add/opinion` - store an opinion, answers `ok`
//! - `POST /opinions/near` - JSON array of live opinions, nearest first
//! - `GET /stats` - service counters
//!
//! Bodies are decoded by hand rather than through the `Json` extractor so
//! that every malformed request gets the same `400` regardless of its
//! content type.
//!
//! # Example
//!
//! ```ignore
//! use murmur_server::transport::http::run_server;
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! run_server(listener, db, shutdown).await?;
//! ```

use crate::error::AppError;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use murmur::Murmur;
use murmur_types::opinion::{NearQuery, NewOpinion, Opinion};
use murmur_types::stats::ServiceStats;
use std::future::Future;
use tracing::{debug, info};

/// Build the HTTP router around a service handle.
pub fn router(db: Murmur) -> Router {
    Router::new()
        .route("/add/opinion", post(add_opinion))
        .route("/opinions/near", post(opinions_near))
        .route("/stats", get(stats))
        .with_state(db)
}

async fn add_opinion(State(db): State<Murmur>, body: Bytes) -> Result<&'static str, AppError> {
    let opinion: NewOpinion = serde_json::from_slice(&body)?;
    let id = db.submit(opinion).await?;
    debug!("Stored opinion {}", id);
    Ok("ok")
}

async fn opinions_near(
    State(db): State<Murmur>,
    body: Bytes,
) -> Result<Json<Vec<Opinion>>, AppError> {
    let query: NearQuery = serde_json::from_slice(&body)?;
    Ok(Json(db.near(query).await?))
}

async fn stats(State(db): State<Murmur>) -> Result<Json<ServiceStats>, AppError> {
    Ok(Json(db.stats().await?))
}

/// Run the HTTP server until `shutdown` resolves, then drain open requests.
pub async fn run_server(
    listener: tokio::net::TcpListener,
    db: Murmur,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("murmur HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(db))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
