mod application;
mod domain;
mod infrastructure;
mod presentation;

use dotenv::dotenv;

use crate::infrastructure::{AppConfig, AppContainer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Starting docquota on port {} (quota limits: free={}, pro={})",
        config.port,
        config.quota_limits.free,
        config.quota_limits.pro
    );

    let container = AppContainer::new(&config).await?;
    container.http_server().run().await
}
