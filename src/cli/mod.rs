//! # Command Line Interface
//!
//! `dbcreds` subcommands for fetching, renewing and revoking database
//! credentials, inspecting roles, checking broker health and bootstrapping
//! the broker's database engine.

pub mod admin;
pub mod config;
pub mod config_cmd;
pub mod creds;
pub mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::broker::VaultBroker;
use crate::config::{AppConfig, DEFAULT_ROLE};
use crate::credentials::CredentialFetcher;

#[derive(Parser)]
#[command(name = "dbcreds")]
#[command(about = "Dynamic database credentials from a Vault-compatible secrets broker")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Broker address (overrides VAULT_ADDR)
    #[arg(long, global = true, value_name = "URL")]
    pub address: Option<String>,

    /// Broker token (overrides VAULT_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Path to a file containing the broker token
    #[arg(long, global = true, value_name = "FILE")]
    pub token_file: Option<PathBuf>,

    /// Vault Enterprise namespace
    #[arg(long, global = true)]
    pub namespace: Option<String>,

    /// Mount path of the database secrets engine
    #[arg(long, global = true)]
    pub mount: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a new username/password pair for a role
    #[command(
        after_help = "EXAMPLES:\n    # Fetch credentials for the default role\n    dbcreds creds\n\n    # Export into the current shell\n    eval \"$(dbcreds creds readonly --output env --reveal)\""
    )]
    Creds {
        /// Role name
        #[arg(value_name = "ROLE", env = "DB_ROLE", default_value = DEFAULT_ROLE)]
        role: String,

        /// Output format (json, yaml, env, or table)
        #[arg(short, long, default_value = "table", value_parser = ["json", "yaml", "env", "table"])]
        output: String,

        /// Print the password instead of [REDACTED]
        #[arg(long)]
        reveal: bool,
    },

    /// Extend a lease
    Renew {
        /// Lease id returned with the credentials
        #[arg(value_name = "LEASE_ID")]
        lease_id: String,

        /// Requested extension, e.g. 1h or 3600
        #[arg(long, value_name = "TTL")]
        increment: Option<String>,

        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "table", value_parser = ["json", "yaml", "table"])]
        output: String,
    },

    /// Revoke a lease and drop the database user behind it
    Revoke {
        /// Lease id returned with the credentials
        #[arg(value_name = "LEASE_ID")]
        lease_id: String,
    },

    /// Show a role definition
    Role {
        /// Role name
        #[arg(value_name = "ROLE", env = "DB_ROLE", default_value = DEFAULT_ROLE)]
        role: String,

        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "table", value_parser = ["json", "yaml", "table"])]
        output: String,
    },

    /// Check broker health
    Health {
        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "table", value_parser = ["json", "yaml", "table"])]
        output: String,
    },

    /// Configure the database secrets engine and create a role (operator token required)
    #[command(
        after_help = "EXAMPLES:\n    # Create the readonly role with a 6h default TTL\n    DB_USER=postgres DB_PASSWORD=... dbcreds bootstrap --role readonly --default-ttl 6h"
    )]
    Bootstrap {
        /// Role to create
        #[arg(long, env = "DB_ROLE", default_value = DEFAULT_ROLE)]
        role: String,

        /// Default lease TTL (overrides DB_DEFAULT_TTL)
        #[arg(long, value_name = "TTL")]
        default_ttl: Option<String>,

        /// Maximum lease TTL (overrides DB_MAX_TTL)
        #[arg(long, value_name = "TTL")]
        max_ttl: Option<String>,

        /// Do not try to enable the secrets engine
        #[arg(long)]
        skip_enable: bool,
    },

    /// Fetch credentials and log in to the database with them
    Verify {
        /// Role name
        #[arg(value_name = "ROLE", env = "DB_ROLE", default_value = DEFAULT_ROLE)]
        role: String,

        /// Revoke the lease after a successful login
        #[arg(long)]
        revoke: bool,
    },

    /// Manage ~/.dbcreds/config.toml
    Config {
        #[command(subcommand)]
        command: config_cmd::ConfigCommands,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut app = AppConfig::from_env().context("Failed to load configuration from environment")?;
    initialise_logging(&mut app, cli.verbose, cli.json_logs);

    if let Commands::Config { command } = cli.command {
        return config_cmd::handle_config_command(command);
    }

    let overrides = config::BrokerOverrides {
        address: cli.address,
        token: cli.token,
        token_file: cli.token_file,
        namespace: cli.namespace,
        mount: cli.mount,
        timeout: cli.timeout,
    };
    let file = config::CliConfig::load()?;
    app.broker = config::resolve_broker_config(app.broker, &file, &overrides)?;
    app.validate().context("Invalid configuration")?;
    crate::observability::log_config_info(&app);

    match cli.command {
        Commands::Creds { role, output, reveal } => {
            creds::fetch(&create_fetcher(&app)?, &role, output.parse()?, reveal).await?
        }
        Commands::Renew { lease_id, increment, output } => {
            creds::renew(&create_fetcher(&app)?, &lease_id, increment.as_deref(), output.parse()?)
                .await?
        }
        Commands::Revoke { lease_id } => creds::revoke(&create_fetcher(&app)?, &lease_id).await?,
        Commands::Role { role, output } => {
            creds::role(&create_fetcher(&app)?, &role, output.parse()?).await?
        }
        Commands::Verify { role, revoke } => {
            creds::verify(&create_fetcher(&app)?, &app.database, &role, revoke).await?
        }
        Commands::Health { output } => admin::health(&create_fetcher(&app)?, output.parse()?).await?,
        Commands::Bootstrap { role, default_ttl, max_ttl, skip_enable } => {
            if let Some(ttl) = default_ttl {
                app.bootstrap.default_ttl = ttl;
            }
            if let Some(ttl) = max_ttl {
                app.bootstrap.max_ttl = ttl;
            }
            if skip_enable {
                app.bootstrap.enable_engine = false;
            }
            admin::bootstrap(&app, &role).await?
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Create the credential fetcher over the Vault HTTP client
fn create_fetcher(app: &AppConfig) -> anyhow::Result<CredentialFetcher> {
    let broker = VaultBroker::new(&app.broker).context("Failed to create broker client")?;
    Ok(CredentialFetcher::new(Arc::new(broker), &app.broker.database_mount)?)
}

fn initialise_logging(app: &mut AppConfig, verbose: bool, json_logs: bool) {
    if verbose {
        app.observability.log_level = "debug".to_string();
    }
    if json_logs {
        app.observability.json_logging = true;
    }

    // Returns false when a subscriber is already set (e.g. integration tests).
    crate::observability::init_observability(&app.observability);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_creds_flags() {
        let cli = Cli::try_parse_from([
            "dbcreds",
            "--address",
            "http://vault:8200",
            "creds",
            "reporting",
            "--output",
            "env",
            "--reveal",
        ])
        .unwrap();

        assert_eq!(cli.address.as_deref(), Some("http://vault:8200"));
        match cli.command {
            Commands::Creds { role, output, reveal } => {
                assert_eq!(role, "reporting");
                assert_eq!(output, "env");
                assert!(reveal);
            }
            _ => panic!("expected creds command"),
        }
    }

    #[test]
    fn test_parse_bootstrap_flags() {
        let cli = Cli::try_parse_from([
            "dbcreds",
            "bootstrap",
            "--role",
            "readonly",
            "--default-ttl",
            "6h",
            "--skip-enable",
        ])
        .unwrap();

        match cli.command {
            Commands::Bootstrap { role, default_ttl, max_ttl, skip_enable } => {
                assert_eq!(role, "readonly");
                assert_eq!(default_ttl.as_deref(), Some("6h"));
                assert!(max_ttl.is_none());
                assert!(skip_enable);
            }
            _ => panic!("expected bootstrap command"),
        }
    }

    #[test]
    fn test_unknown_output_format_rejected() {
        assert!(Cli::try_parse_from(["dbcreds", "role", "--output", "xml"]).is_err());
    }
}
