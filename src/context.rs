use crate::configuration::Configuration;

pub struct Context {
    pub config: Configuration,
}

impl Context {
    pub fn from_cli(cli: &crate::cli::Cli) -> Self {
        let cfg = Configuration {
            api_url: cli.api_url.clone(),
            token: cli.token.clone(),
            per_page: cli.per_page.min(crate::github::MAX_PAGE_SIZE),
            fetch_concurrency: cli.fetch_concurrency.max(1),
            api_listen: cli.api_listen,
            log_file: cli.log_file.clone(),
        };
        Self { config: cfg }
    }
}
