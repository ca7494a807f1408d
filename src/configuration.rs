use std::net::SocketAddr;
use std::path::PathBuf;

use url::Url;

#[derive(Clone, Debug)]
pub struct Configuration {
    pub api_url: Url,
    pub token: Option<String>,
    pub per_page: u32,
    pub fetch_concurrency: usize,
    pub api_listen: SocketAddr,
    pub log_file: Option<PathBuf>,
}
