//! nimbus CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use nimbus_client::error::ClientResult;
use nimbus_client::{repl, Session};

/// nimbus - talk to a NATS-style publish/subscribe server
#[derive(Debug, Parser)]
#[command(name = "nimbus")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Server host
    #[arg(long, default_value = "127.0.0.1", env = "NIMBUS_HOST")]
    host: String,

    /// Server port
    #[arg(long, default_value_t = 4222, env = "NIMBUS_PORT")]
    port: u16,

    /// Enable debug output
    #[arg(long, short = 'v')]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let session = Session::connect(&cli.host, cli.port).await?;
    repl::run(session).await
}
