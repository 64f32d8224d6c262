mod app;
mod cache;
mod commands;
mod config;
mod coordinator;
mod event;
mod logging;
mod mutation;
mod render;
mod seed;
mod service;
mod view;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wo")]
#[command(about = "A terminal work order tracker with a synchronized local cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/wo/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the work order service (overrides config and WO_SERVICE_URL)
  #[arg(short, long)]
  url: Option<String>,

  /// Use an in-process service instead of a remote one
  #[arg(short, long, conflicts_with = "url")]
  memory: bool,

  /// Add demo work orders if the service is empty
  #[arg(short, long)]
  seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override service URL if specified on command line
  if let Some(url) = args.url {
    config.service.url = Some(url);
  }

  let _guard = logging::setup_logging(&config)?;

  // Initialize and run the app
  let backend = app::Backend::from_config(&config, args.memory);
  let mut app = app::App::new(&config, backend);
  app.run(args.seed).await?;

  Ok(())
}
