//! Configuration management CLI commands
//!
//! Provides commands for managing ~/.dbcreds/config.toml

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::Path;

use super::config::CliConfig;
use super::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize configuration file with default values
    Init {
        /// Overwrite existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    Show {
        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "table", value_parser = ["json", "yaml", "table"])]
        output: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (address, token, namespace, mount, or timeout)
        key: String,

        /// Configuration value
        value: String,
    },

    /// Get configuration file path
    Path,
}

/// Handle config commands
pub fn handle_config_command(command: ConfigCommands) -> Result<()> {
    let path = CliConfig::config_path()?;

    match command {
        ConfigCommands::Init { force } => init_config(&path, force),
        ConfigCommands::Show { output } => show_config(&path, output.parse()?),
        ConfigCommands::Set { key, value } => set_config(&path, &key, &value),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            path.display()
        );
    }

    CliConfig::default().save_to_path(path)?;

    println!("✅ Configuration file created at: {}", path.display());
    println!("\nYou can now set values using:");
    println!("  dbcreds config set address <broker-url>");
    println!("  dbcreds config set token <token>");
    println!("  dbcreds config set mount <mount>");

    Ok(())
}

fn show_config(path: &Path, format: OutputFormat) -> Result<()> {
    if !path.exists() {
        println!("No configuration file found at: {}", path.display());
        println!("\nRun 'dbcreds config init' to create one");
        return Ok(());
    }

    let mut config = CliConfig::load_from_path(path)?;
    if config.token.is_some() {
        config.token = Some("[REDACTED]".to_string());
    }

    match format {
        OutputFormat::Json => output::print_json(&config),
        OutputFormat::Yaml => output::print_yaml(&config),
        OutputFormat::Env | OutputFormat::Table => {
            let unset = || "<not set>".to_string();
            output::print_key_values(&[
                ("address", config.address.clone().unwrap_or_else(unset)),
                ("token", config.token.clone().unwrap_or_else(unset)),
                ("namespace", config.namespace.clone().unwrap_or_else(unset)),
                ("mount", config.mount.clone().unwrap_or_else(unset)),
                ("timeout", config.timeout.map(|t| format!("{} seconds", t)).unwrap_or_else(unset)),
            ]);
            println!("Config file: {}", path.display());
            Ok(())
        }
    }
}

/// Apply `key = value` to `config`; returns a confirmation message.
pub fn apply_setting(config: &mut CliConfig, key: &str, value: &str) -> Result<String> {
    match key {
        "address" => {
            config.address = Some(value.to_string());
            Ok(format!("Address set to: {}", value))
        }
        "token" => {
            config.token = Some(value.to_string());
            Ok("Token set successfully".to_string())
        }
        "namespace" => {
            config.namespace = Some(value.to_string());
            Ok(format!("Namespace set to: {}", value))
        }
        "mount" => {
            config.mount = Some(value.to_string());
            Ok(format!("Mount set to: {}", value))
        }
        "timeout" => {
            let timeout: u64 =
                value.parse().context("Invalid timeout value. Must be a number in seconds")?;
            config.timeout = Some(timeout);
            Ok(format!("Timeout set to: {} seconds", timeout))
        }
        _ => anyhow::bail!(
            "Unknown configuration key: '{}'. Valid keys: address, token, namespace, mount, timeout",
            key
        ),
    }
}

fn set_config(path: &Path, key: &str, value: &str) -> Result<()> {
    // A missing file starts from defaults; an unreadable one is never overwritten.
    let mut config = CliConfig::load_from_path(path)?;
    let message = apply_setting(&mut config, key, value)?;
    config.save_to_path(path)?;

    println!("✅ {}", message);
    println!("Configuration saved to: {}", path.display());
    Ok(())
}
