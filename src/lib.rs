pub mod cli;
pub mod converter;
pub mod core;
pub mod providers;

pub use crate::converter::{RateCache, RefreshReport};
pub use crate::core::{ConvertError, Converter};

use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Rates { symbols: Vec<String> },
    Convert { amount: f64, symbol: String },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxmod starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Rates { symbols } => cli::rates::run_rates(&config, &symbols).await,
        AppCommand::Convert { amount, symbol } => {
            cli::rates::run_convert(&config, amount, &symbol).await
        }
    }
}
