use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use beacon_server::config::ServerConfig;
use beacon_server::queue::JobQueue;
use beacon_server::runner::LighthouseRunner;
use beacon_server::store::ArtifactStore;
use beacon_server::worker::Worker;
use beacon_server::{create_router, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "loaded configuration");

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    tracing::info!(database = %config.database_url, "database ready");

    let queue = JobQueue::new(pool);
    let store = ArtifactStore::open(&config.reports_dir).await?;
    tracing::info!(reports_dir = %store.root().display(), "artifact store ready");

    // One background consumer drains the queue; the API stays responsive
    // while audits run.
    let worker = Worker::new(
        queue.clone(),
        store.clone(),
        LighthouseRunner::new(&config.lighthouse_bin),
    );
    tokio::spawn(worker.run());

    let app = create_router(queue, &config.reports_dir)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
