mod api_doc;
mod error;
mod handlers;
mod setup;
mod state;
mod task_handlers;

use fotofair_core::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let config = Config::from_env()?;

    let (state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    // HTTP has drained; stop the worker pool before the process exits.
    state.task_queue.shutdown().await;

    Ok(())
}
