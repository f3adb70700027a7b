//! API routes for the beacon server.

pub mod audits;

use std::path::Path;

use axum::Router;
use tower_http::services::ServeDir;

use crate::queue::JobQueue;
use crate::store::REPORTS_ROUTE;

/// Creates the main router: audit endpoints plus static report serving.
///
/// `/reports` serves the artifact directory directly; its HEAD responses
/// are the existence probe remote watchers rely on, so it must be mounted
/// over the same directory the worker writes to.
pub fn create_router(queue: JobQueue, reports_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .merge(audits::router(queue))
        .nest_service(REPORTS_ROUTE, ServeDir::new(reports_dir.as_ref()))
}
