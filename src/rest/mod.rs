use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::activity::ActivityLog;
use crate::aggregator::Aggregator;
use crate::github::ArtifactsApi;
use crate::store::RepoStore;
use crate::sweeper::Sweeper;

mod handlers;
pub mod models;

use handlers::{
    delete_artifact, get_log, get_repository, health, list_repositories, not_found, put_selection,
    reload, sweep_repository, sweep_selected,
};

pub struct AppState<C> {
    pub aggregator: Arc<Aggregator<C>>,
    pub sweeper: Arc<Sweeper<C>>,
    pub store: Arc<RepoStore>,
    pub log: Arc<ActivityLog>,
    pub token: Option<String>,
    pub started_at: SystemTime,
}

// Not derived: C itself has no Clone bound, only the Arcs are cloned.
impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            aggregator: self.aggregator.clone(),
            sweeper: self.sweeper.clone(),
            store: self.store.clone(),
            log: self.log.clone(),
            token: self.token.clone(),
            started_at: self.started_at,
        }
    }
}

pub fn router<C: ArtifactsApi + Send + Sync + 'static>(state: AppState<C>) -> Router {
    Router::new()
        .route("/health", get(health::<C>))
        .route("/repositories", get(list_repositories::<C>))
        .route("/repositories/:id", get(get_repository::<C>))
        .route(
            "/repositories/:id/artifacts/:artifact_id",
            delete(delete_artifact::<C>),
        )
        .route("/repositories/:id/sweep", post(sweep_repository::<C>))
        .route("/sweep", post(sweep_selected::<C>))
        .route("/selection", put(put_selection::<C>))
        .route("/reload", post(reload::<C>))
        .route("/log", get(get_log::<C>))
        .fallback(not_found)
        .with_state(state)
}

pub async fn serve<C: ArtifactsApi + Send + Sync + 'static>(
    addr: SocketAddr,
    state: AppState<C>,
    shutdown: tokio_util::sync::CancellationToken,
) -> anyhow::Result<()> {
    log::info!("🌐 REST service on http://{}", addr);

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            log::info!("🛑 REST shutdown requested");
        })
        .await?;
    log::info!("👋 REST server exited");
    Ok(())
}
