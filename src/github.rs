use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::model::{Artifact, RepoSummary};

pub const MAX_PAGE_SIZE: u32 = 100;
const USER_AGENT: &str = concat!("gha-sweep/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid api url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api base url cannot be extended with path segments")]
    BaseUrl,
    #[error("unexpected status {status} for {url}")]
    Status { status: StatusCode, url: String },
}

/// Seam over the provider's artifact REST API. Everything the aggregator and
/// the sweeper need, and nothing else, so tests can swap in a scripted mock.
#[async_trait]
pub trait ArtifactsApi {
    /// First page of the caller's repositories, most recently updated first.
    async fn list_repositories(
        &self,
        token: &str,
        per_page: u32,
    ) -> Result<Vec<RepoSummary>, ApiError>;

    /// First page of Actions artifacts for one repository.
    async fn list_artifacts(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<Artifact>, ApiError>;

    async fn delete_artifact(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        artifact_id: u64,
    ) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct RepoDto {
    id: u64,
    name: String,
    full_name: String,
}

/// Wire shape; `created_at` is nullable in the provider's schema, so one
/// null must not fail deserialization of the whole page.
#[derive(Debug, Deserialize)]
struct ArtifactDto {
    id: u64,
    name: String,
    size_in_bytes: u64,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    expired: bool,
}

impl From<ArtifactDto> for Artifact {
    fn from(dto: ArtifactDto) -> Self {
        Artifact {
            id: dto.id,
            name: dto.name,
            size_in_bytes: dto.size_in_bytes,
            // Null timestamps sort as oldest.
            created_at: dto.created_at.unwrap_or(DateTime::UNIX_EPOCH),
            expired: dto.expired,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArtifactListDto {
    artifacts: Vec<ArtifactDto>,
}

/// GitHub REST implementation. No retries and no pagination beyond the first
/// page; callers cap `per_page` at [`MAX_PAGE_SIZE`].
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    base: Url,
}

impl GithubClient {
    pub fn new(base: Url) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, parts: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::BaseUrl)?
            .pop_if_empty()
            .extend(parts);
        Ok(url)
    }

    fn check_status(resp: &reqwest::Response) -> Result<(), ApiError> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                status,
                url: resp.url().to_string(),
            })
        }
    }
}

#[async_trait]
impl ArtifactsApi for GithubClient {
    async fn list_repositories(
        &self,
        token: &str,
        per_page: u32,
    ) -> Result<Vec<RepoSummary>, ApiError> {
        let url = self.endpoint(&["user", "repos"])?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .header(ACCEPT, "application/vnd.github+json")
            .query(&[
                ("per_page", per_page.min(MAX_PAGE_SIZE).to_string()),
                ("sort", "updated".to_string()),
            ])
            .send()
            .await?;
        Self::check_status(&resp)?;
        let repos: Vec<RepoDto> = resp.json().await?;
        Ok(repos
            .into_iter()
            .map(|r| RepoSummary {
                id: r.id,
                name: r.name,
                full_name: r.full_name,
            })
            .collect())
    }

    async fn list_artifacts(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<Artifact>, ApiError> {
        let url = self.endpoint(&["repos", owner, repo, "actions", "artifacts"])?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .header(ACCEPT, "application/vnd.github+json")
            .query(&[("per_page", per_page.min(MAX_PAGE_SIZE).to_string())])
            .send()
            .await?;
        Self::check_status(&resp)?;
        let list: ArtifactListDto = resp.json().await?;
        Ok(list.artifacts.into_iter().map(Artifact::from).collect())
    }

    async fn delete_artifact(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        artifact_id: u64,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&[
            "repos",
            owner,
            repo,
            "actions",
            "artifacts",
            &artifact_id.to_string(),
        ])?;
        let resp = self
            .http
            .delete(url)
            .bearer_auth(token)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        Self::check_status(&resp)
    }
}
