use anyhow::Result;
use clap::Parser;

mod bundle;
mod cli;
mod config;
mod engine;
mod lander;
mod monitoring;
mod protocol;
mod wallet;

use cli::args::{Cli, Command};
use config::load_config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match cli.command {
        Command::Init(args) => return cli::context::init_configs(args),
        _ => load_config(cli.config.clone())?,
    };
    cli::context::init_tracing(&config.global.logging)?;
    cli::run(cli, config).await
}
