use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;

use hxloop::config::Config;
use hxloop::server::{init_tracing, AppServer};

const DEFAULT_TEMPLATE_DIR: &str = "templates";

/// Development server for the hypermedia tutorial app.
#[derive(Debug, Parser)]
#[command(name = "hxloop", version, about)]
struct Cli {
    /// Interface to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Reload templates from disk when they change
    #[arg(long)]
    reload: bool,

    /// Path to config.toml (default: platform config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.reload && config.templates.dir.is_none() {
            let dir = Path::new(DEFAULT_TEMPLATE_DIR);
            if dir.is_dir() {
                config.templates.dir = Some(dir.to_path_buf());
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("Config file '{}' not found", path.display());
            }
            Config::load_from(path)?
        }
        None => Config::load()?,
    };

    cli.apply(&mut config);
    config.validate()?;

    let mut server = AppServer::from_config(&config, cli.reload)
        .context("Failed to start server")?;
    server.bind().await?;
    server.run().await?;
    Ok(())
}
