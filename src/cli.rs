use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "zipbox")]
#[command(about = "Fetch media batches, zip them and publish the archive", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $ZIPBOX_CONFIG or config/zipbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP intake together with the worker pool
    Server(ServerArgs),
    /// Run a single job in the foreground and print its result as JSON
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (overrides server.bind_addr)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Job identifier; also names the uploaded archive
    #[arg(long)]
    pub job_id: String,

    #[arg(long, default_value = "campaign")]
    pub job_type: String,

    /// Callback URL notified when the job completes
    #[arg(long)]
    pub webhook: Option<String>,

    /// Media URLs to fetch
    #[arg(required = true)]
    pub urls: Vec<String>,
}
