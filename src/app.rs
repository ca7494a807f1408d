use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context as AnyhowContext, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::activity::ActivityLog;
use crate::aggregator::Aggregator;
use crate::github::{ArtifactsApi, GithubClient};
use crate::model::{format_bytes, Repository, SweepPolicy};
use crate::store::RepoStore;
use crate::sweeper::Sweeper;
use crate::{cli, context, rest};

/// The main application state.
/// Decoupled from CLI parsing so tests can inject a mock API client.
pub struct App<C: ArtifactsApi = GithubClient> {
    ctx: context::Context,
    store: Arc<RepoStore>,
    log: Arc<ActivityLog>,
    aggregator: Arc<Aggregator<C>>,
    sweeper: Arc<Sweeper<C>>,
    shutdown: CancellationToken,
}

impl App {
    /// Build the App from CLI arguments. Handles the side-effecting parts:
    /// log-file attachment and HTTP client construction.
    pub fn from_cli() -> Result<(App<GithubClient>, cli::Cli)> {
        let cli = cli::parse();

        crate::tracing::attach_log_file(cli.log_file.as_deref().map(Path::new));

        let ctx = context::Context::from_cli(&cli);
        log_startup_info(&ctx);

        let client =
            GithubClient::new(ctx.config.api_url.clone()).context("building API client")?;

        Ok((App::new(ctx, Arc::new(client)), cli))
    }
}

impl<C: ArtifactsApi + Send + Sync + 'static> App<C> {
    fn new(ctx: context::Context, api: Arc<C>) -> Self {
        let store = Arc::new(RepoStore::new());
        let log = Arc::new(ActivityLog::new());
        let aggregator = Arc::new(
            Aggregator::new(api.clone(), store.clone(), log.clone())
                .with_per_page(ctx.config.per_page)
                .with_fetch_concurrency(ctx.config.fetch_concurrency),
        );
        let sweeper = Arc::new(Sweeper::new(api, store.clone(), log.clone()));
        Self {
            ctx,
            store,
            log,
            aggregator,
            sweeper,
            shutdown: CancellationToken::new(),
        }
    }

    /// Main entry point for the daemon: REST surface plus an initial load.
    pub async fn run_daemon(&self) -> Result<()> {
        self.log_runtime_config();

        let mut rest_handle = self.spawn_rest_server();
        self.spawn_initial_load();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => log::info!("🧨 Ctrl-C received, shutting down..."),
            _ = &mut rest_handle => log::error!("REST task exited unexpectedly"),
        }

        self.shutdown.cancel();
        if !rest_handle.is_finished() {
            let _ = rest_handle.await;
        }

        log::info!("✅ Shutdown complete");
        Ok(())
    }

    /// One-shot: load everything and print a summary table.
    pub async fn run_list(&self, hide_empty: bool) -> Result<()> {
        let token = self.require_token()?.to_string();
        self.aggregator
            .load_all(Some(&token))
            .await
            .context("loading repositories")?;

        let mut repos = self.store.snapshot();
        if hide_empty {
            repos.retain(|r| r.artifact_count > 0);
        }
        println!("{:<45} {:>9} {:>12}", "REPOSITORY", "ARTIFACTS", "SIZE");
        for repo in &repos {
            println!(
                "{:<45} {:>9} {:>12}",
                repo.full_name,
                repo.artifact_count,
                format_bytes(repo.total_size)
            );
        }
        Ok(())
    }

    /// One-shot: load everything, then bulk-delete per the policy.
    pub async fn run_sweep(&self, names: &[String], policy: SweepPolicy) -> Result<()> {
        let token = self.require_token()?.to_string();
        self.aggregator
            .load_all(Some(&token))
            .await
            .context("loading repositories")?;

        let ids = select_repo_ids(&self.store.snapshot(), names);
        if ids.is_empty() {
            log::warn!("nothing to sweep");
            return Ok(());
        }
        self.store.set_selection(ids);

        let Some(reports) = self.sweeper.sweep_selected(&token, policy).await else {
            anyhow::bail!("a sweep is already running");
        };
        for (id, report) in &reports {
            let name = self
                .store
                .repository(*id)
                .map(|r| r.full_name)
                .unwrap_or_else(|| id.to_string());
            println!(
                "{}: deleted {}/{} artifacts ({} failed)",
                name, report.deleted, report.attempted, report.failed
            );
        }
        Ok(())
    }

    // --- Helper methods ---

    fn spawn_rest_server(&self) -> JoinHandle<()> {
        let addr = self.ctx.config.api_listen;
        let state = rest::AppState {
            aggregator: self.aggregator.clone(),
            sweeper: self.sweeper.clone(),
            store: self.store.clone(),
            log: self.log.clone(),
            token: self.ctx.config.token.clone(),
            started_at: SystemTime::now(),
        };
        let token = self.shutdown.clone();

        tokio::spawn(async move {
            if let Err(e) = rest::serve(addr, state, token).await {
                log::error!("REST server failed: {:#}", e);
            }
        })
    }

    fn spawn_initial_load(&self) -> JoinHandle<()> {
        let aggregator = self.aggregator.clone();
        let credential = self.ctx.config.token.clone();

        tokio::spawn(async move {
            if let Err(e) = aggregator.load_all(credential.as_deref()).await {
                log::error!("initial load failed: {:#}", e);
            }
        })
    }

    fn require_token(&self) -> Result<&str> {
        self.ctx
            .config
            .token
            .as_deref()
            .context("no credential configured; set GITHUB_TOKEN or pass --token")
    }

    fn log_runtime_config(&self) {
        log::info!("🧮 Page size: {}", self.ctx.config.per_page);
        log::info!("🧮 Fetch concurrency: {}", self.ctx.config.fetch_concurrency);
        if let Some(path) = self.ctx.config.log_file.as_deref() {
            log::info!("📝 Log file: {}", path.to_string_lossy());
        }
    }
}

// --- Standalone helpers ---

/// Resolve CLI repo arguments (owner/name or bare name) against the loaded
/// list; empty input means every repository. Unknown names are logged and
/// skipped.
fn select_repo_ids(repos: &[Repository], names: &[String]) -> Vec<u64> {
    if names.is_empty() {
        return repos.iter().map(|r| r.id).collect();
    }
    let mut ids = Vec::new();
    for name in names {
        match repos.iter().find(|r| r.full_name == *name || r.name == *name) {
            Some(repo) => ids.push(repo.id),
            None => log::warn!("repository {:?} not found; skipping", name),
        }
    }
    ids
}

fn log_startup_info(ctx: &context::Context) {
    log::info!("🚀 Starting gha-sweep");
    log::info!("🔗 API base URL: {}", ctx.config.api_url);
    log::info!(
        "🔑 Credential: {}",
        if ctx.config.token.is_some() {
            "present"
        } else {
            "absent"
        }
    );
}

// --- Entry point ---

pub async fn run() -> Result<()> {
    let (app, cli) = App::from_cli()?;

    match &cli.command {
        Some(cli::Command::List { hide_empty }) => app.run_list(*hide_empty).await,
        Some(cli::Command::Sweep { repos, policy }) => app.run_sweep(repos, *policy).await,
        None => app.run_daemon().await,
    }
}
