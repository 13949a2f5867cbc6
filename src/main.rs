use anyhow::Result;
use sphinx_exporter::cli::{actions, commands, dispatch};
use tracing::error;
use tracing_subscriber::EnvFilter;

async fn start() -> Result<()> {
    let matches = commands::new().get_matches();
    let action = dispatch::handler(&matches)?;
    actions::run::handle(action).await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Scrape-time errors are absorbed into metrics; only configuration and
    // bind errors reach this point.
    if let Err(err) = start().await {
        error!(error = %err, "exporter failed to start");
        std::process::exit(1);
    }
}
