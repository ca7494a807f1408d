use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::github::ArtifactsApi;

use super::{
    models::{
        report_to_response, repository_to_detail, repository_to_response, ErrorResponse,
        HealthResponse, LogResponse, RepositoriesResponse, SelectionRequest, SweepRequest,
        SweepResponse,
    },
    AppState,
};

#[derive(Deserialize, Default)]
pub struct ListQuery {
    #[serde(default)]
    pub hide_empty: bool,
}

pub async fn health<C: ArtifactsApi + Send + Sync + 'static>(
    State(state): State<AppState<C>>,
) -> impl IntoResponse {
    let uptime_secs = state.started_at.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            uptime_secs,
        }),
    )
}

pub async fn list_repositories<C: ArtifactsApi + Send + Sync + 'static>(
    State(state): State<AppState<C>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let selected = state.store.selected();
    let repositories = state
        .store
        .snapshot()
        .iter()
        .filter(|r| !query.hide_empty || r.artifact_count > 0)
        .map(|r| repository_to_response(r, selected.contains(&r.id)))
        .collect();
    Json(RepositoriesResponse {
        loading: state.store.is_list_loading(),
        deleting: state.store.is_deleting(),
        repositories,
    })
}

pub async fn get_repository<C: ArtifactsApi + Send + Sync + 'static>(
    State(state): State<AppState<C>>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    match state.store.repository(id) {
        Some(repo) => Json(repository_to_detail(&repo)).into_response(),
        None => not_found().await.into_response(),
    }
}

pub async fn get_log<C: ArtifactsApi + Send + Sync + 'static>(
    State(state): State<AppState<C>>,
) -> impl IntoResponse {
    Json(LogResponse {
        entries: state.log.entries_desc(),
    })
}

pub async fn put_selection<C: ArtifactsApi + Send + Sync + 'static>(
    State(state): State<AppState<C>>,
    Json(req): Json<SelectionRequest>,
) -> impl IntoResponse {
    state.store.set_selection(req.repository_ids);
    StatusCode::NO_CONTENT
}

pub async fn reload<C: ArtifactsApi + Send + Sync + 'static>(
    State(state): State<AppState<C>>,
) -> impl IntoResponse {
    let Some(token) = state.token.clone() else {
        return unauthorized();
    };
    let aggregator = state.aggregator.clone();
    tokio::spawn(async move {
        if let Err(e) = aggregator.load_all(Some(&token)).await {
            log::error!("reload failed: {:#}", e);
        }
    });
    StatusCode::ACCEPTED.into_response()
}

pub async fn delete_artifact<C: ArtifactsApi + Send + Sync + 'static>(
    State(state): State<AppState<C>>,
    Path((repo_id, artifact_id)): Path<(u64, u64)>,
) -> impl IntoResponse {
    let Some(token) = state.token.as_deref() else {
        return unauthorized();
    };
    match state.sweeper.delete_one(token, repo_id, artifact_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                message: e.to_string(),
            }),
        )
            .into_response(),
    }
}

pub async fn sweep_repository<C: ArtifactsApi + Send + Sync + 'static>(
    State(state): State<AppState<C>>,
    Path(repo_id): Path<u64>,
    Json(req): Json<SweepRequest>,
) -> impl IntoResponse {
    let Some(token) = state.token.as_deref() else {
        return unauthorized();
    };
    match state
        .sweeper
        .sweep_repository(token, repo_id, req.policy)
        .await
    {
        Some(report) => Json(SweepResponse {
            reports: vec![report_to_response(repo_id, report)],
        })
        .into_response(),
        None => sweep_in_progress(),
    }
}

pub async fn sweep_selected<C: ArtifactsApi + Send + Sync + 'static>(
    State(state): State<AppState<C>>,
    Json(req): Json<SweepRequest>,
) -> impl IntoResponse {
    let Some(token) = state.token.as_deref() else {
        return unauthorized();
    };
    match state.sweeper.sweep_selected(token, req.policy).await {
        Some(reports) => Json(SweepResponse {
            reports: reports
                .into_iter()
                .map(|(id, report)| report_to_response(id, report))
                .collect(),
        })
        .into_response(),
        None => sweep_in_progress(),
    }
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            message: "endpoint not found".to_string(),
        }),
    )
}

fn unauthorized() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            message: "no credential configured".to_string(),
        }),
    )
        .into_response()
}

fn sweep_in_progress() -> axum::response::Response {
    (
        StatusCode::CONFLICT,
        Json(ErrorResponse {
            message: "a sweep is already running".to_string(),
        }),
    )
        .into_response()
}
