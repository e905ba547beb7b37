use std::sync::Arc;

use anyhow::Result;
use warp::Filter;

use shovel::api;
use shovel::config::Settings;
use shovel::repository::Repository;
use shovel::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = get_subscriber("shovel-d".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber)?;

    let settings = Settings::from_env()?;
    let store = settings.store.connect().await?;
    let repo = Arc::new(Repository::load(store).await);

    run(settings, repo).await;

    Ok(())
}

async fn run(settings: Settings, repo: Arc<Repository>) {
    let routes = api::routes(repo).with(warp::trace::request());

    tracing::info!(addr = %settings.addr, "Listening");
    warp::serve(routes).run(settings.addr).await;
}
