use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

use crate::model::SweepPolicy;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(
        about = "Fetch repositories and print per-repository artifact totals",
        long_about = "Loads the first page of your repositories, fetches artifact metadata for each and prints a summary table."
    )]
    List {
        #[arg(long, default_value_t = false, help = "Skip repositories without artifacts")]
        hide_empty: bool,
    },
    #[command(
        about = "Bulk-delete Actions artifacts",
        long_about = "Deletes artifacts from the named repositories (or from every repository when none are named). Deletions run one at a time; individual failures are logged and skipped."
    )]
    Sweep {
        #[arg(
            value_name = "REPO",
            help = "Repositories to sweep, as owner/name or bare name; default is every repository"
        )]
        repos: Vec<String>,
        #[arg(
            long,
            value_enum,
            default_value_t = SweepPolicy::All,
            help = "Deletion policy: everything, or everything but the newest artifact"
        )]
        policy: SweepPolicy,
    },
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "List GitHub repositories and sweep their Actions artifacts",
    long_about = "Enumerates the authenticated user's repositories, aggregates Actions artifact\nmetadata and bulk-deletes artifacts, with a live progress log.\n\nWithout a subcommand it runs as a daemon exposing the view state over a small\nREST API.\n\nEnvironment:\n  GITHUB_TOKEN      Bearer token used for every API call\n  GITHUB_API_URL    API base URL (default https://api.github.com)\n"
)]
pub struct Cli {
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, help = "GitHub bearer token")]
    pub token: Option<String>,

    #[arg(
        long,
        env = "GITHUB_API_URL",
        default_value = "https://api.github.com",
        value_name = "URL",
        help = "API base URL (GitHub Enterprise: https://<host>/api/v3)"
    )]
    pub api_url: Url,

    #[arg(
        short = 'p',
        long,
        default_value_t = 100u32,
        value_name = "N",
        help = "Page size for list calls; only the first page is fetched (max 100)"
    )]
    pub per_page: u32,

    #[arg(
        short = 'j',
        long,
        default_value_t = 8usize,
        value_name = "N",
        help = "Maximum concurrently outstanding artifact fetches"
    )]
    pub fetch_concurrency: usize,

    #[arg(
        long,
        default_value = "127.0.0.1:3000",
        value_name = "ADDR",
        help = "REST listen address for the daemon"
    )]
    pub api_listen: SocketAddr,

    #[arg(long, value_name = "PATH", help = "Append logs to this file as well as stderr")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

pub fn parse() -> Cli {
    Cli::parse()
}
