use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single Actions artifact. `id` is only unique within its repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: u64,
    pub name: String,
    pub size_in_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub expired: bool,
}

/// Minimal repository descriptor as returned by the provider's list call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoSummary {
    pub id: u64,
    pub name: String,
    pub full_name: String,
}

/// View-model entry for one repository. `artifact_count` and `total_size`
/// must always equal a fold over `artifacts`; use [`Repository::set_artifacts`]
/// and [`Repository::retain_artifacts`] so they never drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub artifact_count: usize,
    pub total_size: u64,
    pub artifacts: Vec<Artifact>,
    pub loading: bool,
}

impl Repository {
    /// Placeholder entry published before any artifact data exists.
    pub fn skeleton(summary: RepoSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            full_name: summary.full_name,
            artifact_count: 0,
            total_size: 0,
            artifacts: Vec::new(),
            loading: true,
        }
    }

    /// Owner half of `full_name` ("<owner>/<name>").
    pub fn owner(&self) -> Option<&str> {
        self.full_name.split_once('/').map(|(owner, _)| owner)
    }

    pub fn set_artifacts(&mut self, artifacts: Vec<Artifact>) {
        self.artifact_count = artifacts.len();
        self.total_size = artifacts.iter().map(|a| a.size_in_bytes).sum();
        self.artifacts = artifacts;
        self.loading = false;
    }

    /// Drop every artifact whose id is in `deleted`, recomputing aggregates.
    pub fn retain_artifacts(&mut self, deleted: &[u64]) {
        self.artifacts.retain(|a| !deleted.contains(&a.id));
        self.artifact_count = self.artifacts.len();
        self.total_size = self.artifacts.iter().map(|a| a.size_in_bytes).sum();
    }

    /// Artifacts newest-first, ties kept in provider order.
    pub fn artifacts_newest_first(&self) -> Vec<Artifact> {
        let mut sorted = self.artifacts.clone();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sorted
    }
}

/// Bulk deletion policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SweepPolicy {
    /// Delete every artifact in the repository.
    All,
    /// Delete everything except the most recently created artifact.
    KeepLatest,
}

/// Outcome of one per-repository sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub attempted: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Human-readable byte count, base 1024, up to two decimals.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exp = (bytes.ilog2() / 10).min(UNITS.len() as u32 - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = (value * 100.0).round() / 100.0;
    // Trim trailing zeros: 1.50 -> 1.5, 2.00 -> 2
    let mut text = format!("{:.2}", rounded);
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    format!("{} {}", text, UNITS[exp as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn artifact(id: u64, size: u64) -> Artifact {
        Artifact {
            id,
            name: format!("build-{}", id),
            size_in_bytes: size,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            expired: false,
        }
    }

    #[test]
    fn skeleton_starts_empty() {
        let repo = Repository::skeleton(RepoSummary {
            id: 1,
            name: "web".into(),
            full_name: "acme/web".into(),
        });
        assert_eq!(repo.artifact_count, 0);
        assert_eq!(repo.total_size, 0);
        assert!(repo.artifacts.is_empty());
        assert!(repo.loading);
        assert_eq!(repo.owner(), Some("acme"));
    }

    #[test]
    fn set_artifacts_recomputes_aggregates() {
        let mut repo = Repository::skeleton(RepoSummary {
            id: 1,
            name: "web".into(),
            full_name: "acme/web".into(),
        });
        repo.set_artifacts(vec![artifact(10, 500), artifact(11, 1500)]);
        assert_eq!(repo.artifact_count, 2);
        assert_eq!(repo.total_size, 2000);
        assert!(!repo.loading);
    }

    #[test]
    fn retain_artifacts_drops_only_listed_ids() {
        let mut repo = Repository::skeleton(RepoSummary {
            id: 1,
            name: "web".into(),
            full_name: "acme/web".into(),
        });
        repo.set_artifacts(vec![artifact(10, 500), artifact(11, 1500), artifact(12, 8)]);
        repo.retain_artifacts(&[10, 12]);
        assert_eq!(repo.artifact_count, 1);
        assert_eq!(repo.total_size, 1500);
        assert_eq!(repo.artifacts[0].id, 11);
    }

    #[test]
    fn owner_handles_malformed_full_name() {
        let mut repo = Repository::skeleton(RepoSummary {
            id: 1,
            name: "web".into(),
            full_name: "acme/web".into(),
        });
        repo.full_name = "no-slash".into();
        assert_eq!(repo.owner(), None);
    }

    #[test]
    fn format_bytes_matches_display_rules() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(2000), "1.95 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3 GB");
    }
}
