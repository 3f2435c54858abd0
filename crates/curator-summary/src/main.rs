// curator-summary/crates/curator-summary/src/main.rs

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use curator_summary::{config::Config, run_server, telemetry};

/// Serve narrative summaries of visitor comments per collection.
#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "curator-summary", version)]
struct Args {
    /// Env file read before the process environment
    #[arg(long, default_value = ".env")]
    env_file: std::path::PathBuf,

    /// Override API_HOST
    #[arg(long)]
    host: Option<String>,

    /// Override API_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init_tracing();

    let mut cfg = Config::from_env_file(&args.env_file)?;
    if let Some(host) = args.host {
        cfg.api_host = host;
    }
    if let Some(port) = args.port {
        cfg.api_port = port;
    }

    run_server(cfg).await
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
