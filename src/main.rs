use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use pagewatch::checker::CheckRunner;
use pagewatch::config::{EnvSource, FileSecretSource, LayeredSource, Settings};
use pagewatch::fetch::HttpFetcher;
use pagewatch::notify::WebhookNotifier;
use pagewatch::scheduler::CheckScheduler;
use pagewatch::store::FileStore;

#[derive(Parser)]
#[command(name = "pagewatch", about = "Watches web pages for changes and sends notifications")]
struct Cli {
    /// Run a single check cycle and exit instead of scheduling.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pagewatch=debug".parse()?),
        )
        .init();

    let mut source = LayeredSource::new().with(EnvSource);
    if let Ok(secrets_dir) = std::env::var("SECRETS_DIR") {
        source = source.with(FileSecretSource::new(secrets_dir));
    }
    let settings = Arc::new(Settings::load(&source)?);

    let timeout_secs = settings.value("requestTimeoutSecs").parse().unwrap_or(0);
    let state_dir = match settings.value("dirName") {
        "" => "data",
        dir => dir,
    };
    let token = match settings.value("notifyToken") {
        "" => None,
        t => Some(t.to_string()),
    };

    let runner = Arc::new(CheckRunner::new(
        Arc::clone(&settings),
        Arc::new(HttpFetcher::new(timeout_secs)?),
        Arc::new(FileStore::new(state_dir)),
        Arc::new(WebhookNotifier::new(settings.value("notifyEndpoint"), token)?),
    ));

    if cli.once {
        let state_file = match settings.value("lastChangedFileName") {
            "" => "lastChanged.txt",
            name => name,
        };
        let outcome = runner.run(state_file).await?;
        info!(
            "single cycle done: changed={}, error_notified={}, persisted={}",
            outcome.changed, outcome.error_notified, outcome.persisted
        );
        return Ok(());
    }

    let mut scheduler = CheckScheduler::new(Arc::clone(&settings), runner).await?;
    scheduler.start().await?;

    info!("pagewatch running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    scheduler.shutdown().await?;
    info!("shutting down...");

    Ok(())
}
