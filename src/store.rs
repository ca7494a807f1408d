use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use crate::model::{Artifact, Repository};

/// Partial update applied to a single repository entry.
#[derive(Debug, Clone)]
pub enum RepoUpdate {
    /// Artifact fetch resolved; replaces the collection and clears `loading`.
    ArtifactsLoaded(Vec<Artifact>),
    /// Artifact fetch failed; the repository degrades to empty, not unknown.
    FetchFailed,
    /// These artifact ids were confirmed deleted by the provider.
    ArtifactsRemoved(Vec<u64>),
}

/// The single owned view state: the repository list, the selection set and
/// the in-flight flags. Every mutation of a repository entry goes through
/// [`RepoStore::apply`], which recomputes the derived aggregates inside one
/// write-lock critical section so no partial merge is ever observable.
#[derive(Debug, Default)]
pub struct RepoStore {
    repos: RwLock<Vec<Repository>>,
    selection: Mutex<HashSet<u64>>,
    deleting: AtomicBool,
    list_loading: AtomicBool,
}

impl RepoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list, e.g. with skeleton entries at load start.
    pub fn replace_all(&self, repos: Vec<Repository>) {
        *self.repos.write().unwrap() = repos;
    }

    pub fn clear(&self) {
        self.replace_all(Vec::new());
    }

    /// Apply a partial update to the repository with this id. Unknown ids are
    /// a no-op; returns whether anything changed.
    pub fn apply(&self, repo_id: u64, update: RepoUpdate) -> bool {
        let mut repos = self.repos.write().unwrap();
        let Some(repo) = repos.iter_mut().find(|r| r.id == repo_id) else {
            return false;
        };
        match update {
            RepoUpdate::ArtifactsLoaded(artifacts) => repo.set_artifacts(artifacts),
            RepoUpdate::FetchFailed => repo.set_artifacts(Vec::new()),
            RepoUpdate::ArtifactsRemoved(ids) => repo.retain_artifacts(&ids),
        }
        true
    }

    pub fn snapshot(&self) -> Vec<Repository> {
        self.repos.read().unwrap().clone()
    }

    pub fn repository(&self, repo_id: u64) -> Option<Repository> {
        self.repos
            .read()
            .unwrap()
            .iter()
            .find(|r| r.id == repo_id)
            .cloned()
    }

    // --- Selection set ---

    pub fn set_selection(&self, repo_ids: impl IntoIterator<Item = u64>) {
        *self.selection.lock().unwrap() = repo_ids.into_iter().collect();
    }

    /// Selected ids in the order they appear in the repository list, so bulk
    /// operations process repositories in display order.
    pub fn selected(&self) -> Vec<u64> {
        let selection = self.selection.lock().unwrap();
        self.repos
            .read()
            .unwrap()
            .iter()
            .filter(|r| selection.contains(&r.id))
            .map(|r| r.id)
            .collect()
    }

    pub fn clear_selection(&self) {
        self.selection.lock().unwrap().clear();
    }

    // --- In-flight flags ---

    /// Claim the single sweep slot. Fails if another sweep holds it; the
    /// claim and the check are one atomic step, so two concurrent sweeps
    /// can never both pass.
    pub fn try_begin_sweep(&self) -> bool {
        self.deleting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn end_sweep(&self) {
        self.deleting.store(false, Ordering::SeqCst);
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting.load(Ordering::SeqCst)
    }

    pub fn set_list_loading(&self, value: bool) {
        self.list_loading.store(value, Ordering::SeqCst);
    }

    pub fn is_list_loading(&self) -> bool {
        self.list_loading.load(Ordering::SeqCst)
    }
}
