mod commands;
mod output;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Hyperion - run declarative task documents
#[derive(Parser)]
#[command(name = "hyperion", version, about = "Run hyperion documents locally or as a service")]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a document
    Run(commands::run::RunArgs),
    /// Read a document and report problems without running it
    Validate(commands::validate::ValidateArgs),
    /// Accept documents over HTTP
    Serve(commands::serve::ServeArgs),
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::try_from_env("HYPERION_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run(args) => commands::run::execute(args).await,
        Command::Validate(args) => commands::validate::execute(args),
        Command::Serve(args) => commands::serve::execute(args).await,
    }
}
