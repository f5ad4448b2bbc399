//! Configuration file commands.

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use crate::cli::{ConfigAction, ConfigCommand};
use crate::config::Config;

pub fn execute(cmd: ConfigCommand, config: &Config) -> Result<()> {
    match cmd.action {
        ConfigAction::Show => {
            println!("{} {}", "#".dimmed(), Config::config_path().display().to_string().dimmed());
            print!("{}", config.to_toml()?);
            Ok(())
        }
        ConfigAction::Init { force } => init(force),
        ConfigAction::Path => {
            println!("{}", Config::config_path().display());
            Ok(())
        }
    }
}

fn init(force: bool) -> Result<()> {
    let path = Config::config_path();

    // Confirm unless --force
    if path.exists() && !force {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", path.display()))
            .default(false)
            .interact()?;

        if !overwrite {
            println!("{}", "Cancelled.".yellow());
            return Ok(());
        }
    }

    Config::default().save_to(&path)?;
    println!("{} Wrote {}", "✓".green(), path.display().to_string().cyan());
    Ok(())
}
