use anyhow::Result;
use clap::{Parser, Subcommand};
use skiff_backend::config::SkiffConfig;
use skiff_backend::node::SkiffNode;
use skiff_backend::telemetry;

#[derive(Parser)]
#[command(author, version, about = "Skiff forum backend daemon")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let args = Args::parse();

    let config = SkiffConfig::from_env()?;
    let node = SkiffNode::start(config)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => node.run_http_server().await,
    }
}
