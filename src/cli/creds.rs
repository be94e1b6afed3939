//! Credential CLI commands
//!
//! `creds`, `renew`, `revoke`, `role` and `verify`.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;

use super::output::{self, CredentialsView, OutputFormat};
use crate::broker::LeaseRenewal;
use crate::config::DatabaseConfig;
use crate::credentials::{ConnectionTarget, CredentialFetcher, RoleDefinition};
use crate::utils::{format_ttl, parse_ttl};

/// Fetch and print credentials for `role`.
pub async fn fetch(
    fetcher: &CredentialFetcher,
    role: &str,
    format: OutputFormat,
    reveal: bool,
) -> Result<()> {
    let credentials = fetcher
        .fetch(role)
        .await
        .with_context(|| format!("Failed to fetch credentials for role '{}'", role))?;

    CredentialsView::new(&credentials, reveal).print(format)
}

pub async fn renew(
    fetcher: &CredentialFetcher,
    lease_id: &str,
    increment: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let increment = increment.map(parse_ttl).transpose().context("Invalid --increment")?;
    let renewal = fetcher
        .renew(lease_id, increment)
        .await
        .with_context(|| format!("Failed to renew lease '{}'", lease_id))?;

    print_renewal(&renewal, format)
}

fn print_renewal(renewal: &LeaseRenewal, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => output::print_json(renewal),
        OutputFormat::Yaml => output::print_yaml(renewal),
        OutputFormat::Env | OutputFormat::Table => {
            println!("{} Renewed lease {}", "✅".green(), renewal.lease_id);
            output::print_key_values(&[
                ("lease_duration", output::format_lease(renewal.lease_duration)),
                ("renewable", renewal.renewable.to_string()),
            ]);
            Ok(())
        }
    }
}

pub async fn revoke(fetcher: &CredentialFetcher, lease_id: &str) -> Result<()> {
    fetcher
        .revoke(lease_id)
        .await
        .with_context(|| format!("Failed to revoke lease '{}'", lease_id))?;

    println!("{} Revoked lease {}", "✅".green(), lease_id);
    Ok(())
}

#[derive(Serialize)]
struct RoleView<'a> {
    name: &'a str,
    db_name: &'a str,
    default_ttl: String,
    max_ttl: String,
    creation_statements: &'a [String],
    revocation_statements: &'a [String],
}

impl<'a> From<&'a RoleDefinition> for RoleView<'a> {
    fn from(role: &'a RoleDefinition) -> Self {
        Self {
            name: &role.name,
            db_name: &role.db_name,
            default_ttl: format_ttl(role.default_ttl),
            max_ttl: format_ttl(role.max_ttl),
            creation_statements: &role.creation_statements,
            revocation_statements: &role.revocation_statements,
        }
    }
}

pub async fn role(fetcher: &CredentialFetcher, role: &str, format: OutputFormat) -> Result<()> {
    let definition = fetcher
        .read_role(role)
        .await
        .with_context(|| format!("Failed to read role '{}'", role))?;
    let view = RoleView::from(&definition);

    match format {
        OutputFormat::Json => output::print_json(&view),
        OutputFormat::Yaml => output::print_yaml(&view),
        OutputFormat::Env | OutputFormat::Table => {
            output::print_key_values(&[
                ("name", view.name.to_string()),
                ("db_name", view.db_name.to_string()),
                ("default_ttl", view.default_ttl.clone()),
                ("max_ttl", view.max_ttl.clone()),
            ]);
            println!("{}", "Creation statements:".bold());
            for statement in view.creation_statements {
                println!("  {}", statement);
            }
            if !view.revocation_statements.is_empty() {
                println!("{}", "Revocation statements:".bold());
                for statement in view.revocation_statements {
                    println!("  {}", statement);
                }
            }
            Ok(())
        }
    }
}

/// Fetch credentials for `role` and log in with them.
pub async fn verify(
    fetcher: &CredentialFetcher,
    database: &DatabaseConfig,
    role: &str,
    revoke_after: bool,
) -> Result<()> {
    let credentials = fetcher
        .fetch(role)
        .await
        .with_context(|| format!("Failed to fetch credentials for role '{}'", role))?;

    let target = ConnectionTarget::from(database);
    let verified = target.verify(&credentials).await;

    if revoke_after {
        fetcher
            .revoke(&credentials.lease.lease_id)
            .await
            .with_context(|| format!("Failed to revoke lease '{}'", credentials.lease.lease_id))?;
    }

    let current_user = verified.with_context(|| {
        format!("Login to {}:{}/{} failed", target.host, target.port, target.database)
    })?;

    println!(
        "{} Logged in to {} as {} (lease expires {})",
        "✅".green(),
        target.database,
        current_user.green(),
        output::format_expiry(credentials.lease.expires_at())
    );
    if revoke_after {
        println!("Revoked lease {}", credentials.lease.lease_id);
    }
    Ok(())
}
