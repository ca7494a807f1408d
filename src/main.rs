use dotenvy::dotenv;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    gha_sweep::tracing::init();
    gha_sweep::app::run().await
}
