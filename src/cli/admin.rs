//! Broker administration CLI commands: `health` and `bootstrap`.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use super::output::{self, OutputFormat};
use crate::bootstrap::Bootstrapper;
use crate::config::AppConfig;
use crate::credentials::CredentialFetcher;

/// Print broker health; fails if the broker is sealed or uninitialized.
pub async fn health(fetcher: &CredentialFetcher, format: OutputFormat) -> Result<()> {
    let health = fetcher
        .health()
        .await
        .with_context(|| format!("Failed to reach broker at {}", fetcher.broker().address()))?;

    match format {
        OutputFormat::Json => output::print_json(&health)?,
        OutputFormat::Yaml => output::print_yaml(&health)?,
        OutputFormat::Env | OutputFormat::Table => {
            let status =
                if health.is_ready() { "ready".green().to_string() } else { "not ready".red().to_string() };
            output::print_key_values(&[
                ("address", fetcher.broker().address().to_string()),
                ("status", status),
                ("initialized", health.initialized.to_string()),
                ("sealed", health.sealed.to_string()),
                ("standby", health.standby.to_string()),
                ("version", health.version.clone().unwrap_or_else(|| "unknown".to_string())),
            ]);
        }
    }

    if !health.is_ready() {
        anyhow::bail!("Broker is not ready (initialized={}, sealed={})", health.initialized, health.sealed);
    }
    Ok(())
}

/// Enable the engine, configure the connection and create `role`.
pub async fn bootstrap(app: &AppConfig, role: &str) -> Result<()> {
    let bootstrapper = Bootstrapper::new(&app.broker)?;

    println!("Bootstrapping role '{}' at {}/roles/{}...", role, bootstrapper.mount(), role);
    let report = bootstrapper
        .run(role, &app.database, &app.bootstrap)
        .await
        .with_context(|| format!("Bootstrap of role '{}' failed", role))?;

    println!("{} Role '{}' is ready", "✅".green(), report.role);
    output::print_key_values(&[
        ("mount", report.mount.clone()),
        ("engine_enabled", report.engine_enabled.to_string()),
        ("connection", report.connection.clone()),
        ("default_ttl", report.default_ttl.clone()),
        ("max_ttl", report.max_ttl.clone()),
    ]);
    println!("Fetch credentials with: dbcreds creds {}", report.role);
    Ok(())
}
