use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxmod::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fxmod::AppCommand {
    fn from(cmd: Commands) -> fxmod::AppCommand {
        match cmd {
            Commands::Rates { symbols } => fxmod::AppCommand::Rates { symbols },
            Commands::Convert { amount, symbol } => fxmod::AppCommand::Convert { amount, symbol },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display current conversion multipliers to USD
    Rates {
        /// Symbols to show; all known symbols when omitted
        symbols: Vec<String>,
    },
    /// Convert an amount into USD
    Convert {
        amount: f64,
        symbol: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxmod::cli::setup::setup(),
        Some(cmd) => fxmod::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
