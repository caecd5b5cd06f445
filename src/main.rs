mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("heicpack=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run(Cli::parse()).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
