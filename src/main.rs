mod cli;

use clap::Parser;
use color_eyre::Result;

use kennel::config::Config;
use kennel::logging;

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = cli::Args::parse();
  let log_guard = logging::init(args.log_dir.as_deref())?;

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  let ctx = cli::Context::new(config, args.ephemeral)?;
  let ok = cli::run(&ctx, args.command).await?;

  if !ok {
    drop(log_guard);
    std::process::exit(1);
  }
  Ok(())
}
