use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::LogEntry;
use crate::model::{format_bytes, Repository, SweepPolicy, SweepReport};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
}

#[derive(Serialize, Deserialize)]
pub struct RepositoryResponse {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub artifact_count: usize,
    pub total_size: u64,
    pub total_size_human: String,
    pub loading: bool,
    pub selected: bool,
}

#[derive(Serialize, Deserialize)]
pub struct RepositoriesResponse {
    pub loading: bool,
    pub deleting: bool,
    pub repositories: Vec<RepositoryResponse>,
}

#[derive(Serialize, Deserialize)]
pub struct ArtifactResponse {
    pub id: u64,
    pub name: String,
    pub size_in_bytes: u64,
    pub size_human: String,
    pub created_at: DateTime<Utc>,
    pub expired: bool,
}

#[derive(Serialize, Deserialize)]
pub struct RepositoryDetailResponse {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub artifact_count: usize,
    pub total_size: u64,
    pub total_size_human: String,
    pub loading: bool,
    /// Newest first.
    pub artifacts: Vec<ArtifactResponse>,
}

#[derive(Serialize, Deserialize)]
pub struct LogResponse {
    /// Newest first.
    pub entries: Vec<LogEntry>,
}

#[derive(Serialize, Deserialize)]
pub struct SelectionRequest {
    pub repository_ids: Vec<u64>,
}

#[derive(Serialize, Deserialize)]
pub struct SweepRequest {
    pub policy: SweepPolicy,
}

#[derive(Serialize, Deserialize)]
pub struct RepoSweepReport {
    pub repository_id: u64,
    pub attempted: usize,
    pub deleted: usize,
    pub failed: usize,
}

#[derive(Serialize, Deserialize)]
pub struct SweepResponse {
    pub reports: Vec<RepoSweepReport>,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

pub fn repository_to_response(repo: &Repository, selected: bool) -> RepositoryResponse {
    RepositoryResponse {
        id: repo.id,
        name: repo.name.clone(),
        full_name: repo.full_name.clone(),
        artifact_count: repo.artifact_count,
        total_size: repo.total_size,
        total_size_human: format_bytes(repo.total_size),
        loading: repo.loading,
        selected,
    }
}

pub fn repository_to_detail(repo: &Repository) -> RepositoryDetailResponse {
    RepositoryDetailResponse {
        id: repo.id,
        name: repo.name.clone(),
        full_name: repo.full_name.clone(),
        artifact_count: repo.artifact_count,
        total_size: repo.total_size,
        total_size_human: format_bytes(repo.total_size),
        loading: repo.loading,
        artifacts: repo
            .artifacts_newest_first()
            .into_iter()
            .map(|a| ArtifactResponse {
                id: a.id,
                name: a.name,
                size_human: format_bytes(a.size_in_bytes),
                size_in_bytes: a.size_in_bytes,
                created_at: a.created_at,
                expired: a.expired,
            })
            .collect(),
    }
}

pub fn report_to_response(repository_id: u64, report: SweepReport) -> RepoSweepReport {
    RepoSweepReport {
        repository_id,
        attempted: report.attempted,
        deleted: report.deleted,
        failed: report.failed,
    }
}
