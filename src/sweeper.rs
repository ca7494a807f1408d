use std::sync::Arc;

use crate::activity::ActivityLog;
use crate::github::{ApiError, ArtifactsApi};
use crate::model::{SweepPolicy, SweepReport};
use crate::store::{RepoStore, RepoUpdate};

/// Deletes artifacts against the provider and reconciles the store to match.
///
/// Deletions are issued strictly one at a time — both within a repository and
/// across repositories — to bound outstanding mutating calls against a
/// rate-limited provider. The fetch side may fan out; the delete side must not.
pub struct Sweeper<C> {
    api: Arc<C>,
    store: Arc<RepoStore>,
    log: Arc<ActivityLog>,
}

impl<C: ArtifactsApi + Send + Sync> Sweeper<C> {
    pub fn new(api: Arc<C>, store: Arc<RepoStore>, log: Arc<ActivityLog>) -> Self {
        Self { api, store, log }
    }

    /// Delete a single artifact. Missing repository or artifact ids are a
    /// no-op. On failure the store is left untouched; there is no retry.
    pub async fn delete_one(
        &self,
        token: &str,
        repo_id: u64,
        artifact_id: u64,
    ) -> Result<(), ApiError> {
        let Some(repo) = self.store.repository(repo_id) else {
            return Ok(());
        };
        let Some(artifact) = repo.artifacts.iter().find(|a| a.id == artifact_id) else {
            return Ok(());
        };
        let Some(owner) = repo.owner() else {
            log::warn!("malformed full_name {:?}", repo.full_name);
            return Ok(());
        };

        self.log.append(format!(
            "Deleting artifact \"{}\" from {}...",
            artifact.name, repo.name
        ));
        match self
            .api
            .delete_artifact(token, owner, &repo.name, artifact_id)
            .await
        {
            Ok(()) => {
                self.log.append(format!(
                    "Successfully deleted artifact \"{}\" from {}",
                    artifact.name, repo.name
                ));
                self.store
                    .apply(repo_id, RepoUpdate::ArtifactsRemoved(vec![artifact_id]));
                Ok(())
            }
            Err(e) => {
                self.log.append(format!(
                    "Error deleting artifact \"{}\" from {}",
                    artifact.name, repo.name
                ));
                log::warn!("delete failed for {}/{}: {}", repo.full_name, artifact_id, e);
                Err(e)
            }
        }
    }

    /// Bulk delete within one repository. Claims the sweep slot for the
    /// duration; returns `None` without issuing any call when another bulk
    /// sweep holds it.
    pub async fn sweep_repository(
        &self,
        token: &str,
        repo_id: u64,
        policy: SweepPolicy,
    ) -> Option<SweepReport> {
        if !self.store.try_begin_sweep() {
            return None;
        }
        let report = self.sweep_repository_inner(token, repo_id, policy).await;
        self.store.end_sweep();
        Some(report)
    }

    /// Candidates come from the current in-memory collection, not a fresh
    /// fetch. Individual failures are logged and skipped; reconciliation
    /// removes exactly the artifacts whose delete call succeeded. Caller
    /// holds the sweep slot.
    async fn sweep_repository_inner(
        &self,
        token: &str,
        repo_id: u64,
        policy: SweepPolicy,
    ) -> SweepReport {
        let Some(repo) = self.store.repository(repo_id) else {
            return SweepReport::default();
        };
        let Some(owner) = repo.owner().map(str::to_owned) else {
            log::warn!("malformed full_name {:?}", repo.full_name);
            return SweepReport::default();
        };

        let mut candidates = repo.artifacts.clone();
        if policy == SweepPolicy::KeepLatest {
            if candidates.is_empty() {
                return SweepReport::default();
            }
            // Stable sort: same-instant artifacts keep provider order, so the
            // excluded "latest" is deterministic.
            candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            candidates.remove(0);
        }

        self.log.append(format!(
            "Deleting {} artifacts from {}...",
            candidates.len(),
            repo.name
        ));

        let mut deleted = Vec::with_capacity(candidates.len());
        let mut failed = 0usize;
        for artifact in &candidates {
            match self
                .api
                .delete_artifact(token, &owner, &repo.name, artifact.id)
                .await
            {
                Ok(()) => {
                    self.log.append(format!(
                        "Successfully deleted artifact \"{}\" from {}",
                        artifact.name, repo.name
                    ));
                    deleted.push(artifact.id);
                }
                Err(e) => {
                    self.log.append(format!(
                        "Error deleting artifact \"{}\" from {}",
                        artifact.name, repo.name
                    ));
                    log::warn!("delete failed for {}/{}: {}", repo.full_name, artifact.id, e);
                    failed += 1;
                }
            }
        }

        let report = SweepReport {
            attempted: candidates.len(),
            deleted: deleted.len(),
            failed,
        };
        self.store
            .apply(repo_id, RepoUpdate::ArtifactsRemoved(deleted));
        self.log.append(format!("Finished processing {}", repo.name));
        report
    }

    /// Bulk delete across the current selection, one repository at a time.
    /// Claims the sweep slot; returns `None` untouched when another bulk
    /// sweep holds it. The selection and the slot are released after every
    /// selected repository has been processed, success or failure.
    pub async fn sweep_selected(
        &self,
        token: &str,
        policy: SweepPolicy,
    ) -> Option<Vec<(u64, SweepReport)>> {
        if !self.store.try_begin_sweep() {
            return None;
        }
        let mut reports = Vec::new();
        for repo_id in self.store.selected() {
            let report = self.sweep_repository_inner(token, repo_id, policy).await;
            reports.push((repo_id, report));
        }
        self.store.clear_selection();
        self.store.end_sweep();
        Some(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Artifact, RepoSummary, Repository};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Holds every delete in flight until the test releases it.
    struct DeleteGate {
        entered: Arc<tokio::sync::Semaphore>,
        release: Arc<tokio::sync::Semaphore>,
    }

    #[derive(Default)]
    struct MockApi {
        failing_artifacts: HashSet<u64>,
        deletes: Mutex<Vec<(String, u64)>>,
        delete_gate: Option<DeleteGate>,
    }

    impl MockApi {
        fn with_failing_artifact(mut self, artifact_id: u64) -> Self {
            self.failing_artifacts.insert(artifact_id);
            self
        }

        fn with_gated_deletes(
            mut self,
        ) -> (Self, Arc<tokio::sync::Semaphore>, Arc<tokio::sync::Semaphore>) {
            let entered = Arc::new(tokio::sync::Semaphore::new(0));
            let release = Arc::new(tokio::sync::Semaphore::new(0));
            self.delete_gate = Some(DeleteGate {
                entered: entered.clone(),
                release: release.clone(),
            });
            (self, entered, release)
        }

        fn deletes(&self) -> Vec<(String, u64)> {
            self.deletes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ArtifactsApi for MockApi {
        async fn list_repositories(
            &self,
            _token: &str,
            _per_page: u32,
        ) -> Result<Vec<RepoSummary>, ApiError> {
            Ok(Vec::new())
        }

        async fn list_artifacts(
            &self,
            _token: &str,
            _owner: &str,
            _repo: &str,
            _per_page: u32,
        ) -> Result<Vec<Artifact>, ApiError> {
            Ok(Vec::new())
        }

        async fn delete_artifact(
            &self,
            _token: &str,
            _owner: &str,
            repo: &str,
            artifact_id: u64,
        ) -> Result<(), ApiError> {
            self.deletes
                .lock()
                .unwrap()
                .push((repo.to_string(), artifact_id));
            if let Some(gate) = &self.delete_gate {
                gate.entered.add_permits(1);
                gate.release.acquire().await.unwrap().forget();
            }
            if self.failing_artifacts.contains(&artifact_id) {
                Err(ApiError::Status {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    url: "http://mock/".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn artifact(id: u64, size: u64, month: u32) -> Artifact {
        Artifact {
            id,
            name: format!("build-{}", id),
            size_in_bytes: size,
            created_at: Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap(),
            expired: false,
        }
    }

    fn loaded_repo(id: u64, name: &str, artifacts: Vec<Artifact>) -> Repository {
        let mut repo = Repository::skeleton(RepoSummary {
            id,
            name: name.into(),
            full_name: format!("acme/{}", name),
        });
        repo.set_artifacts(artifacts);
        repo
    }

    fn sweeper(api: MockApi, repos: Vec<Repository>) -> (Sweeper<MockApi>, Arc<RepoStore>) {
        let store = Arc::new(RepoStore::new());
        store.replace_all(repos);
        let sweeper = Sweeper::new(Arc::new(api), store.clone(), Arc::new(ActivityLog::new()));
        (sweeper, store)
    }

    #[tokio::test]
    async fn delete_one_removes_and_recomputes() {
        let repo = loaded_repo(1, "web", vec![artifact(10, 500, 1), artifact(11, 1500, 2)]);
        let (sweeper, store) = sweeper(MockApi::default(), vec![repo]);

        sweeper.delete_one("token", 1, 10).await.unwrap();

        let repo = store.repository(1).unwrap();
        assert_eq!(repo.artifact_count, 1);
        assert_eq!(repo.total_size, 1500);
        assert_eq!(sweeper.api.deletes(), vec![("web".to_string(), 10)]);

        // Emission order: one "deleting" line, then one success line.
        let texts: Vec<String> = sweeper.log.entries().iter().map(|e| e.text.clone()).collect();
        assert_eq!(
            texts,
            vec![
                "Deleting artifact \"build-10\" from web...".to_string(),
                "Successfully deleted artifact \"build-10\" from web".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn delete_one_missing_ids_is_idempotent() {
        let repo = loaded_repo(1, "web", vec![artifact(10, 500, 1)]);
        let before = vec![repo.clone()];
        let (sweeper, store) = sweeper(MockApi::default(), vec![repo]);

        sweeper.delete_one("token", 99, 10).await.unwrap();
        sweeper.delete_one("token", 1, 99).await.unwrap();

        assert_eq!(store.snapshot(), before);
        assert!(sweeper.api.deletes().is_empty());
    }

    #[tokio::test]
    async fn delete_one_failure_leaves_state_unchanged() {
        let repo = loaded_repo(1, "web", vec![artifact(10, 500, 1)]);
        let before = vec![repo.clone()];
        let api = MockApi::default().with_failing_artifact(10);
        let (sweeper, store) = sweeper(api, vec![repo]);

        let res = sweeper.delete_one("token", 1, 10).await;

        assert!(res.is_err());
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn keep_latest_deletes_all_but_newest() {
        let repo = loaded_repo(1, "web", vec![artifact(1, 100, 1), artifact(2, 200, 2)]);
        let (sweeper, store) = sweeper(MockApi::default(), vec![repo]);

        let report = sweeper
            .sweep_repository("token", 1, SweepPolicy::KeepLatest)
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(sweeper.api.deletes(), vec![("web".to_string(), 1)]);
        let repo = store.repository(1).unwrap();
        assert_eq!(repo.artifacts.len(), 1);
        assert_eq!(repo.artifacts[0].id, 2);
    }

    #[tokio::test]
    async fn keep_latest_on_empty_repo_issues_no_calls() {
        let repo = loaded_repo(1, "web", vec![]);
        let (sweeper, _store) = sweeper(MockApi::default(), vec![repo]);

        let report = sweeper
            .sweep_repository("token", 1, SweepPolicy::KeepLatest)
            .await
            .unwrap();

        assert_eq!(report, SweepReport::default());
        assert!(sweeper.api.deletes().is_empty());
    }

    #[tokio::test]
    async fn sweep_all_empties_the_repository() {
        let repo = loaded_repo(1, "web", vec![artifact(10, 500, 1), artifact(11, 1500, 2)]);
        let (sweeper, store) = sweeper(MockApi::default(), vec![repo]);
        assert_eq!(store.repository(1).unwrap().total_size, 2000);

        let report = sweeper
            .sweep_repository("token", 1, SweepPolicy::All)
            .await
            .unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.deleted, 2);
        let repo = store.repository(1).unwrap();
        assert!(repo.artifacts.is_empty());
        assert_eq!(repo.artifact_count, 0);
        assert_eq!(repo.total_size, 0);
    }

    #[tokio::test]
    async fn partial_failure_retains_failed_artifacts() {
        let repo = loaded_repo(
            1,
            "web",
            vec![artifact(1, 100, 1), artifact(2, 200, 2), artifact(3, 300, 3)],
        );
        let api = MockApi::default().with_failing_artifact(2);
        let (sweeper, store) = sweeper(api, vec![repo]);

        let report = sweeper
            .sweep_repository("token", 1, SweepPolicy::All)
            .await
            .unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.failed, 1);
        let repo = store.repository(1).unwrap();
        assert_eq!(repo.artifacts.len(), 1);
        assert_eq!(repo.artifacts[0].id, 2);
        assert_eq!(repo.total_size, 200);
    }

    #[tokio::test]
    async fn bulk_sweeps_refuse_to_overlap() {
        let repos = vec![
            loaded_repo(1, "web", vec![artifact(10, 1, 1)]),
            loaded_repo(2, "cli", vec![artifact(20, 1, 1)]),
        ];
        let (api, entered, release) = MockApi::default().with_gated_deletes();
        let (sweeper, store) = sweeper(api, repos);
        let sweeper = Arc::new(sweeper);
        store.set_selection([2]);

        let running = tokio::spawn({
            let sweeper = sweeper.clone();
            async move { sweeper.sweep_repository("token", 1, SweepPolicy::All).await }
        });

        // Wait until the first delete is actually in flight.
        entered.acquire().await.unwrap().forget();
        assert!(store.is_deleting());

        // Both bulk entry points must be refused while it is.
        assert!(sweeper.sweep_selected("token", SweepPolicy::All).await.is_none());
        assert!(sweeper
            .sweep_repository("token", 2, SweepPolicy::All)
            .await
            .is_none());
        assert_eq!(sweeper.api.deletes(), vec![("web".to_string(), 10)]);
        // The refused selection sweep left the selection alone.
        assert_eq!(store.selected(), vec![2]);

        release.add_permits(1);
        let report = running.await.unwrap().unwrap();
        assert_eq!(report.deleted, 1);
        assert!(!store.is_deleting());
    }

    #[tokio::test]
    async fn sweep_selected_runs_repos_in_order_and_clears_selection() {
        let repos = vec![
            loaded_repo(1, "web", vec![artifact(10, 1, 1), artifact(11, 1, 2)]),
            loaded_repo(2, "cli", vec![artifact(20, 1, 1)]),
        ];
        let api = MockApi::default().with_failing_artifact(11);
        let (sweeper, store) = sweeper(api, repos);
        store.set_selection([1, 2]);

        let reports = sweeper
            .sweep_selected("token", SweepPolicy::All)
            .await
            .unwrap();

        // Every delete for repo 1 precedes every delete for repo 2.
        let deletes = sweeper.api.deletes();
        assert_eq!(
            deletes,
            vec![
                ("web".to_string(), 10),
                ("web".to_string(), 11),
                ("cli".to_string(), 20),
            ]
        );
        assert_eq!(reports.len(), 2);
        assert!(store.selected().is_empty());
        assert!(!store.is_deleting());
    }
}
