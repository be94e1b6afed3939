//! Broker path construction.
//!
//! The database engine exposes credentials at `<mount>/creds/<role>` and role
//! definitions at `<mount>/roles/<role>`. Role and mount values end up inside
//! a URL path, so they are validated before any request is built.

use super::error::{BrokerError, Result};

/// Default mount of the database secrets engine.
pub const DEFAULT_DATABASE_MOUNT: &str = "database";

const MAX_ROLE_LEN: usize = 128;

/// Validates a role identifier for use as a single path segment.
///
/// Rejects empty values, values over 128 characters, path separators
/// (`/` and `\`, which URL parsing treats as `/`), dot segments, whitespace
/// and URL delimiters (`?`, `#`, `%`).
pub fn validate_role(role: &str) -> Result<()> {
    if role.is_empty() {
        return Err(BrokerError::invalid_role(role, "role cannot be empty"));
    }

    if role.len() > MAX_ROLE_LEN {
        return Err(BrokerError::invalid_role(
            role,
            format!("exceeds maximum length of {} characters (got {})", MAX_ROLE_LEN, role.len()),
        ));
    }

    if role.contains('/') || role.contains('\\') {
        return Err(BrokerError::invalid_role(role, "cannot contain '/' or '\\' (path separator)"));
    }

    if role == "." {
        return Err(BrokerError::invalid_role(role, "cannot be '.' (dot segment)"));
    }

    if role.contains("..") {
        return Err(BrokerError::invalid_role(role, "cannot contain '..' (path traversal)"));
    }

    if role.chars().any(char::is_whitespace) {
        return Err(BrokerError::invalid_role(role, "cannot contain whitespace"));
    }

    if let Some(c) = role.chars().find(|c| matches!(c, '?' | '#' | '%')) {
        return Err(BrokerError::invalid_role(role, format!("cannot contain '{}'", c)));
    }

    Ok(())
}

/// Normalizes a mount path: strips surrounding slashes and rejects empty or
/// traversal segments. Nested mounts such as `team-a/database` are allowed.
pub fn normalize_mount(mount: &str) -> Result<String> {
    let trimmed = mount.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(BrokerError::config_error("database mount path cannot be empty"));
    }

    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return Err(BrokerError::config_error(format!(
                "invalid database mount path '{}'",
                mount
            )));
        }
    }

    Ok(trimmed.to_string())
}

/// `<mount>/creds/<role>`
pub fn creds_path(mount: &str, role: &str) -> Result<String> {
    validate_role(role)?;
    Ok(format!("{}/creds/{}", normalize_mount(mount)?, role))
}

/// `<mount>/roles/<role>`
pub fn role_path(mount: &str, role: &str) -> Result<String> {
    validate_role(role)?;
    Ok(format!("{}/roles/{}", normalize_mount(mount)?, role))
}

/// `<mount>/config/<connection>`
pub fn connection_path(mount: &str, connection: &str) -> Result<String> {
    validate_role(connection)?;
    Ok(format!("{}/config/{}", normalize_mount(mount)?, connection))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creds_path_default_mount() {
        assert_eq!(creds_path(DEFAULT_DATABASE_MOUNT, "readonly").unwrap(), "database/creds/readonly");
    }

    #[test]
    fn test_role_path_nested_mount() {
        assert_eq!(role_path("/team-a/database/", "readonly").unwrap(), "team-a/database/roles/readonly");
    }

    #[test]
    fn test_validate_role_valid() {
        for role in ["readonly", "read-write", "app_role_1", "Reporting.v2"] {
            assert!(validate_role(role).is_ok(), "{role} should be valid");
        }
    }

    #[test]
    fn test_validate_role_empty_and_long() {
        let err = validate_role("").unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));

        let long = "a".repeat(129);
        let err = validate_role(&long).unwrap_err();
        assert!(err.to_string().contains("maximum length"));
        assert!(validate_role(&"a".repeat(128)).is_ok());
    }

    #[test]
    fn test_validate_role_injection() {
        let err = validate_role("readonly/../../sys").unwrap_err();
        assert!(err.to_string().contains("'/'"));

        let err = validate_role("ro..admin").unwrap_err();
        assert!(err.to_string().contains("'..'"));

        let err = validate_role("read only").unwrap_err();
        assert!(err.to_string().contains("whitespace"));

        assert!(validate_role("readonly?list=true").is_err());
        assert!(validate_role("readonly#x").is_err());
        assert!(validate_role("%2e%2e").is_err());
    }

    #[test]
    fn test_validate_role_rejects_url_normalized_segments() {
        let err = validate_role("a\\b").unwrap_err();
        assert!(matches!(err, BrokerError::InvalidRole { .. }));
        assert!(err.to_string().contains("path separator"));

        assert!(validate_role("\\").is_err());
        assert!(validate_role(".").is_err());
        assert!(validate_role("..").is_err());
        assert!(validate_role(".hidden").is_ok());
        assert!(normalize_mount("team\\database").is_err());
    }

    #[test]
    fn test_normalize_mount_rejects_bad_segments() {
        assert!(normalize_mount("").is_err());
        assert!(normalize_mount("///").is_err());
        assert!(normalize_mount("database/../sys").is_err());
        assert!(normalize_mount("a//b").is_err());
        assert_eq!(normalize_mount("database").unwrap(), "database");
    }

    #[test]
    fn test_paths_never_built_for_invalid_role() {
        assert!(creds_path("database", "../sys").is_err());
        assert!(role_path("database", "").is_err());
        assert!(connection_path("database", "pg/x").is_err());
    }
}
