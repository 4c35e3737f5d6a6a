// crates/marvin/src/main.rs

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use marvin::{config::Config, run_server};

#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "marvin", version, about = "Marvin coaching chat backend")]
struct Cli {
    /// Address to bind, overrides API_HOST
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overrides API_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Run against the in-memory store with MARVIN_DEV_TOKENS
    #[arg(long)]
    dev: bool,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = if cli.dev {
        dotenvy::dotenv().ok();
        Config::from_vars(|key| match key {
            "MARVIN_BACKEND" => Ok("memory".to_string()),
            _ => std::env::var(key),
        })?
    } else {
        Config::from_env()?
    };

    if let Some(host) = cli.host {
        cfg.api_host = host;
    }
    if let Some(port) = cli.port {
        cfg.api_port = port;
    }

    run_server(cfg).await
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
