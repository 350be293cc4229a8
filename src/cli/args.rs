//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::watcher::EventFlags;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Per-path filesystem change subscriptions
#[derive(Parser, Debug)]
#[command(
    name = "pathwatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch paths and print only the change categories you ask for",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration
    #[command(about = "Set up .pathwatch directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// Watch paths and print matching events
    #[command(
        about = "Watch paths and print matching events",
        after_help = "Examples:\n  pathwatch watch src\n  pathwatch watch -r src --flags create,delete\n  pathwatch watch Cargo.toml --flags 'MODIFY|FILE_WRITE'\n\nCategories:\n  create, modify, delete, rename, file_write, all, none"
    )]
    Watch {
        /// Paths to watch
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Also watch everything beneath each path
        #[arg(short, long)]
        recursive: bool,

        /// Categories to report (defaults to watcher.default_flags)
        #[arg(short, long, value_name = "LIST")]
        flags: Option<EventFlags>,

        /// Exit after this many events
        #[arg(long, value_name = "N")]
        max_events: Option<usize>,
    },
}
