mod cli;
mod server;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    zipbox::observability::init_tracing("info");

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => server::run(cli.config, args).await?,
        Commands::Run(args) => server::run_once(cli.config, args).await?,
    }

    Ok(())
}
