use anyhow::{Context, Result, anyhow};
use clap::Parser;

use pathwatch::Settings;
use pathwatch::cli::commands::{init, watch};
use pathwatch::cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .map_err(|e| anyhow!("Configuration error in {}: {e}", path.display()))?,
        None => Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            eprintln!("Using default configuration.");
            Settings::default()
        }),
    };

    pathwatch::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => {
            let dir = std::env::current_dir().context("Cannot read current directory")?;
            init::run_init(&dir, force)
        }
        Commands::Config => init::run_config(&settings),
        Commands::Watch {
            paths,
            recursive,
            flags,
            max_events,
        } => {
            let options = watch::WatchOptions {
                paths,
                recursive,
                flags,
                max_events,
            };
            watch::run(options, &settings).map(|_| ())
        }
    }
}
