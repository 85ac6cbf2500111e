//! Parley server.
//!
//! Configuration comes from defaults, an optional config file, `.env` and
//! `PARLEY_*` environment variables, then these flags.

use clap::Parser;
use parley::{AppConfig, Services};
use std::path::PathBuf;
use tracing::info;

/// Conversation event dispatch service
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "Receive conversation events and route them by priority")]
struct Cli {
    /// Config file (TOML or JSON, chosen by extension)
    #[arg(short, long, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Do not read `.env` from the working directory
    #[arg(long)]
    no_dotenv: bool,
}

impl Cli {
    fn load_config(&self) -> parley_config::Result<AppConfig> {
        let mut builder = AppConfig::builder().dotenv(!self.no_dotenv);

        if let Some(path) = &self.config {
            builder = builder.file(path);
        }
        if let Some(host) = &self.host {
            builder = builder.set("host", host)?;
        }
        if let Some(port) = self.port {
            builder = builder.set("port", port)?;
        }
        if let Some(level) = &self.log_level {
            builder = builder.set("log_level", level)?;
        }

        builder.load()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    let _guard = config.log_config()?.init()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = config.environment.as_str(),
        "Starting parley"
    );

    let services = Services::builder(config).build().await?;
    services.server().listen().await?;

    info!("Server stopped");
    services.shutdown();
    Ok(())
}
