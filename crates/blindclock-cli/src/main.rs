use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod paths;
mod server;

#[derive(Parser)]
#[command(name = "blindclock-cli", version, about = "Blindclock tournament clock CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a blind structure in the terminal
    Play(commands::play::PlayArgs),
    /// Format a number of seconds the way the clock displays it
    Format(commands::format::FormatArgs),
    /// Blind structure files
    Structure {
        #[command(subcommand)]
        action: commands::structure::StructureAction,
    },
    /// Widget configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("BLINDCLOCK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Play(args) => commands::play::run(args),
        Commands::Format(args) => commands::format::run(args),
        Commands::Structure { action } => commands::structure::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
