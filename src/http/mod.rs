mod params;
mod server;

use std::future::Future;
use std::sync::Arc;

use crate::ingest::AnswerIngestService;

pub use server::router;

/// Serve the answer ingress on `host:port` until `shutdown` resolves.
pub async fn run(
    ingest: Arc<AnswerIngestService>,
    host: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(ingest))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
