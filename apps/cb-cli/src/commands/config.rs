// config.rs - `cb config`: show or create the bundle configuration.

use std::fs;
use std::path::Path;

use anyhow::Context;
use cb_bundle::config::{user_config_path, PROJECT_CONFIG_FILE};
use cb_bundle::BundleConfig;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML.
    Show,
    /// Write a default `.clipbundle.toml` into the project root.
    Init,
}

pub fn execute(cmd: &ConfigCommands, project_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let (config, source) = BundleConfig::load_for_project(project_root)
                .context("failed to load bundle configuration")?;
            match source {
                Some(path) => println!("# loaded from {}", path.display()),
                None => {
                    println!("# built-in defaults (no config file found)");
                    println!("#   project: {}", project_root.join(PROJECT_CONFIG_FILE).display());
                    if let Some(user) = user_config_path() {
                        println!("#   user:    {}", user.display());
                    }
                }
            }
            println!();
            print!("{}", config.to_toml()?);
        }

        ConfigCommands::Init => {
            let path = init_project_config(project_root)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

/// Write the default configuration to `<project_root>/.clipbundle.toml`.
/// Refuses to replace an existing file.
pub fn init_project_config(project_root: &Path) -> anyhow::Result<std::path::PathBuf> {
    let path = project_root.join(PROJECT_CONFIG_FILE);
    if path.exists() {
        anyhow::bail!("{} already exists; not overwriting", path.display());
    }
    let text = BundleConfig::default().to_toml()?;
    fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
