pub mod cli;
pub mod coerce;
pub mod config;
pub mod error;
pub mod import;
pub mod io_utils;
pub mod loader;
pub mod mapping;
pub mod mssql;
pub mod plan;
pub mod rows;
pub mod selector;

use std::{env, fs, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands, DefaultConfigArgs},
    config::LoadConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_bulkload", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Load(args) => import::execute(&args),
        Commands::Plan(args) => plan::execute(&args),
        Commands::DefaultConfig(args) => handle_default_config(&args),
    }
}

fn handle_default_config(args: &DefaultConfigArgs) -> Result<()> {
    let yaml = LoadConfig::default().to_yaml_string()?;
    match &args.output {
        Some(path) => {
            fs::write(path, yaml).with_context(|| format!("Writing configuration to {path:?}"))?;
            info!("Default configuration written to {path:?}");
        }
        None => print!("{yaml}"),
    }
    Ok(())
}
