mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use rdx_config::Config;
use rdx_storage::Storage;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (stderr, so redacted output on stdout stays clean)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize storage once (creates connection pool and runs migrations)
    let storage = Storage::new(config.storage.database_path.clone()).await?;

    match cli.command {
        cli::Commands::Redact(args) => commands::redact::handle(args, &config, &storage).await,
        cli::Commands::Entities { file, output } => {
            commands::redact::entities(file, output, &config, &storage).await
        }
        cli::Commands::Rules(rule_cmd) => commands::rules::handle(rule_cmd, &storage).await,
        cli::Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            commands::serve::handle(&config, &storage, host, port).await
        }
    }
}
