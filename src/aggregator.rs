use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::activity::ActivityLog;
use crate::github::{ApiError, ArtifactsApi, MAX_PAGE_SIZE};
use crate::model::{format_bytes, Repository};
use crate::store::{RepoStore, RepoUpdate};

pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Fetches the repository list, then fans out one artifact fetch per
/// repository, merging each result into the shared store as it settles.
/// A failed fetch degrades that repository to empty; it never blocks or
/// fails the others.
pub struct Aggregator<C> {
    api: Arc<C>,
    store: Arc<RepoStore>,
    log: Arc<ActivityLog>,
    per_page: u32,
    fetch_concurrency: usize,
}

impl<C: ArtifactsApi + Send + Sync> Aggregator<C> {
    pub fn new(api: Arc<C>, store: Arc<RepoStore>, log: Arc<ActivityLog>) -> Self {
        Self {
            api,
            store,
            log,
            per_page: MAX_PAGE_SIZE,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.min(MAX_PAGE_SIZE);
        self
    }

    /// Cap on concurrently outstanding artifact fetches.
    pub fn with_fetch_concurrency(mut self, limit: usize) -> Self {
        self.fetch_concurrency = limit.max(1);
        self
    }

    /// Full reload. With no credential this clears state and returns without
    /// touching the provider. A repository-list failure aborts the whole load
    /// to an empty state; per-repository failures only degrade that entry.
    /// Returns once every per-repository fetch has settled.
    pub async fn load_all(&self, token: Option<&str>) -> Result<(), ApiError> {
        let Some(token) = token else {
            self.store.clear();
            self.store.set_list_loading(false);
            return Ok(());
        };

        self.log.clear();
        self.store.set_list_loading(true);
        self.log.append("Fetching repositories...");

        let summaries = match self.api.list_repositories(token, self.per_page).await {
            Ok(summaries) => summaries,
            Err(e) => {
                self.log.append("Error fetching repositories");
                log::error!("repository list fetch failed: {}", e);
                self.store.clear();
                self.store.set_list_loading(false);
                return Err(e);
            }
        };
        self.log
            .append(format!("Found {} repositories", summaries.len()));

        // Publish skeletons first so callers can render before any artifact
        // data exists.
        let repos: Vec<Repository> = summaries.into_iter().map(Repository::skeleton).collect();
        self.store.replace_all(repos.clone());
        self.store.set_list_loading(false);

        stream::iter(repos)
            .for_each_concurrent(self.fetch_concurrency, |repo| async move {
                self.fetch_artifacts(token, &repo).await;
            })
            .await;

        self.log.append("Finished fetching all artifacts");
        Ok(())
    }

    async fn fetch_artifacts(&self, token: &str, repo: &Repository) {
        self.log
            .append(format!("Fetching artifacts for {}...", repo.name));

        let Some(owner) = repo.owner() else {
            log::warn!("malformed full_name {:?}", repo.full_name);
            self.log
                .append(format!("Error fetching artifacts for {}", repo.name));
            self.store.apply(repo.id, RepoUpdate::FetchFailed);
            return;
        };

        match self
            .api
            .list_artifacts(token, owner, &repo.name, self.per_page)
            .await
        {
            Ok(artifacts) => {
                let total: u64 = artifacts.iter().map(|a| a.size_in_bytes).sum();
                self.log.append(format!(
                    "Found {} artifacts in {} ({})",
                    artifacts.len(),
                    repo.name,
                    format_bytes(total)
                ));
                self.store
                    .apply(repo.id, RepoUpdate::ArtifactsLoaded(artifacts));
            }
            Err(e) => {
                log::warn!("artifact fetch failed for {}: {}", repo.full_name, e);
                self.log
                    .append(format!("Error fetching artifacts for {}", repo.name));
                self.store.apply(repo.id, RepoUpdate::FetchFailed);
            }
        }
    }
}
