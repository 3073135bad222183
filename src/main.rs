use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use wxserver::frontend::HeadlessFrontend;
use wxserver::logging::init_logging;
use wxserver::{ServerConfig, XServer};

/// WX X11 server - protocol core with a headless frontend
#[derive(Debug, Parser)]
#[command(name = "wxserver", version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TCP listen address (overrides the config file)
    #[arg(short, long)]
    listen: Option<String>,

    /// Screen size as WIDTHxHEIGHT (overrides the config file)
    #[arg(short, long)]
    screen: Option<String>,
}

fn parse_screen(spec: &str) -> Result<(u16, u16)> {
    let (w, h) = spec
        .split_once('x')
        .context("screen size must look like 1024x768")?;
    Ok((w.parse()?, h.parse()?))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = ServerConfig::load(args.config.as_deref())
        .context("Failed to load server configuration")?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(screen) = args.screen {
        let (width, height) = parse_screen(&screen)?;
        config.display.width = width;
        config.display.height = height;
    }
    init_logging(&config.logging);

    let server = XServer::new(config, Arc::new(HeadlessFrontend::default()));
    server.run().await.context("Failed to run X11 server")?;
    Ok(())
}
