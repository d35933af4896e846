//! # cb-cli
//!
//! Command-line host for clipbundle.
//!
//! - `cb copy [PATHS...]`: bundle files (or `--changes` from git) onto the clipboard
//! - `cb paste`: restore a bundle from the clipboard into the project
//! - `cb preview [PATHS...]`: show what `copy` would include, without copying
//! - `cb config show/init`: inspect or create `.clipbundle.toml`

mod clipboard;
mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Copy files as one pasteable bundle and paste bundles back into files.
#[derive(Parser)]
#[command(name = "cb", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".", global = true)]
    project_root: PathBuf,

    /// Log per-file decisions (filter prunes, skips, writes) to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode files into a bundle and put it on the clipboard.
    Copy(commands::copy::CopyArgs),
    /// Decode a bundle and write its files into the project.
    Paste(commands::paste::PasteArgs),
    /// Show which files a copy would include and the bundle statistics.
    Preview(commands::preview::PreviewArgs),
    /// Inspect or create the bundle configuration.
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommands,
    },
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("cb_bundle={}", level).parse()?)
                .add_directive(format!("cb_vcs={}", level).parse()?)
                .add_directive(format!("cb={}", level).parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let project_root = cli
        .project_root
        .canonicalize()
        .with_context(|| format!("project root {} not found", cli.project_root.display()))?;

    match &cli.command {
        Commands::Copy(args) => commands::copy::execute(args, &project_root),
        Commands::Paste(args) => commands::paste::execute(args, &project_root),
        Commands::Preview(args) => commands::preview::execute(args, &project_root),
        Commands::Config { command } => commands::config::execute(command, &project_root),
    }
}
