//! Inventory parser with environment variable substitution

use crate::{ConfigError, Inventory, Result};
use regex::Regex;
use std::path::Path;

/// Parse a YAML inventory file
pub fn parse_file(path: impl AsRef<Path>) -> Result<Inventory> {
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parse a YAML inventory from a string
///
/// Credentials are resolved against the environment and the result validated.
pub fn parse_str(content: &str) -> Result<Inventory> {
    let mut inventory: Inventory = serde_yaml::from_str(content)?;
    resolve_credentials(&mut inventory)?;
    validate_inventory(&inventory)?;
    Ok(inventory)
}

/// Substitute `${VAR}` references in every asset's credentials
fn resolve_credentials(inventory: &mut Inventory) -> Result<()> {
    for asset in &mut inventory.assets {
        asset.username = substitute_env_vars(&asset.username)?;
        asset.password = substitute_env_vars(&asset.password)?;
        asset.secret = substitute_env_vars(&asset.secret)?;
    }
    Ok(())
}

/// Validate an inventory
fn validate_inventory(inventory: &Inventory) -> Result<()> {
    if inventory.assets.is_empty() {
        return Err(ConfigError::ValidationError(
            "no assets defined".to_string(),
        ));
    }

    for (index, asset) in inventory.assets.iter().enumerate() {
        if asset.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "asset #{} has an empty IP",
                index + 1
            )));
        }
        if asset.device_type.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "asset '{}' has an empty device_type",
                asset.host
            )));
        }
        if asset.port == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "asset '{}' has port 0",
                asset.host
            )));
        }
    }

    if inventory.settings.max_concurrency == Some(0) {
        return Err(ConfigError::ValidationError(
            "max_concurrency must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Substitute environment variables in a string
///
/// Supports `${VAR}` and `${VAR:-default}`. All missing variables are reported
/// together.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}")?;
    let mut result = input.to_string();
    let mut missing = Vec::new();

    for cap in re.captures_iter(input) {
        let full_match = &cap[0];
        let var_expr = &cap[1];

        let (var_name, default_value) = match var_expr.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (var_expr, None),
        };

        match (std::env::var(var_name), default_value) {
            (Ok(value), _) => result = result.replace(full_match, &value),
            (Err(_), Some(default)) => result = result.replace(full_match, default),
            (Err(_), None) => missing.push(var_name.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(ConfigError::EnvVarNotFound(missing.join(", ")));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_defaults() {
        let out = substitute_env_vars("${FLEET_AUDIT_SURELY_UNSET_1:-fallback}").unwrap();
        assert_eq!(out, "fallback");
    }

    #[test]
    fn test_substitute_existing_var() {
        let path = std::env::var("PATH").unwrap();
        assert_eq!(substitute_env_vars("${PATH}").unwrap(), path);
    }

    #[test]
    fn test_substitute_reports_all_missing() {
        let err = substitute_env_vars("${FLEET_AUDIT_MISSING_A}:${FLEET_AUDIT_MISSING_B}")
            .unwrap_err();
        match err {
            ConfigError::EnvVarNotFound(names) => {
                assert!(names.contains("FLEET_AUDIT_MISSING_A"));
                assert!(names.contains("FLEET_AUDIT_MISSING_B"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_plain_values_untouched() {
        assert_eq!(substitute_env_vars("p@ss$word").unwrap(), "p@ss$word");
    }

    #[test]
    fn test_rejects_empty_inventory() {
        let err = parse_str("assets: []").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_numeric_host_is_read_as_text() {
        let yaml = r#"
assets:
  - device_type: linux
    IP: 4200
commands:
  linux:
    - uname -a
"#;
        let inventory = parse_str(yaml).unwrap();
        assert_eq!(inventory.assets[0].host, "4200");
    }

    #[test]
    fn test_blank_host_reaches_validation() {
        let yaml = r#"
assets:
  - device_type: cisco_ios
    IP:
"#;
        let err = parse_str(yaml).unwrap_err();
        assert!(
            matches!(&err, ConfigError::ValidationError(msg) if msg.contains("empty IP")),
            "{err}"
        );
    }

    #[test]
    fn test_rejects_zero_port() {
        let yaml = r#"
assets:
  - device_type: cisco_ios
    IP: 10.0.0.1
    port: 0
"#;
        assert!(matches!(parse_str(yaml), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let yaml = r#"
settings:
  max_concurrency: 0
assets:
  - device_type: cisco_ios
    IP: 10.0.0.1
"#;
        assert!(matches!(parse_str(yaml), Err(ConfigError::ValidationError(_))));
    }
}
