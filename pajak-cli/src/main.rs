use anyhow::Result;
use clap::Parser;
use pajak_cli::{Cli, commands};
use pajak_rag::RagConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A local .env wins over variables already set in the shell.
    dotenvy::dotenv_override().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RagConfig::from_env()?;

    commands::run(cli.command, config).await
}
