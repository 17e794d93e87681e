//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, RetortConfig};
use figment::value::Value;

/// Validates the entire configuration.
pub fn validate_config(config: &RetortConfig) -> ConfigResult<()> {
    if config.rules.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("rules"));
    }

    validate_logging_config(&config.logging)?;

    for (name, settings) in &config.adapters {
        validate_adapter_settings(name, settings)?;
    }

    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.filters.keys().any(|module| module.trim().is_empty()) {
        return Err(ConfigError::validation(
            "Logging filter module names cannot be empty",
        ));
    }

    Ok(())
}

/// Validates one `adapters.<name>` table.
///
/// Adapter schemas belong to the adapters; here only the shape and any
/// endpoint URLs are checked.
fn validate_adapter_settings(name: &str, settings: &Value) -> ConfigResult<()> {
    let Some(table) = settings.as_dict() else {
        return Err(ConfigError::validation(format!(
            "adapters.{name} must be a table"
        )));
    };

    for (key, value) in table {
        if is_endpoint_key(key)
            && let Some(url) = value.as_str()
        {
            validate_url(url)?;
        }
    }

    if let Some(reconnect) = table.get("reconnect") {
        validate_reconnect_settings(name, reconnect)?;
    }

    Ok(())
}

/// Validates an `adapters.<name>.reconnect` table.
///
/// Only the keys that are present are checked; the adapter fills in the rest.
fn validate_reconnect_settings(name: &str, settings: &Value) -> ConfigResult<()> {
    let Some(table) = settings.as_dict() else {
        return Err(ConfigError::validation(format!(
            "adapters.{name}.reconnect must be a table"
        )));
    };
    let field = |key: &str| -> ConfigResult<Option<f64>> {
        match table.get(key) {
            None => Ok(None),
            Some(value) => number(value).map(Some).ok_or_else(|| {
                ConfigError::validation(format!("adapters.{name}.reconnect.{key} must be a number"))
            }),
        }
    };

    let initial = field("initial_delay_ms")?;
    let max = field("max_delay_ms")?;
    let multiplier = field("backoff_multiplier")?;

    if initial.is_some_and(|ms| ms <= 0.0) {
        return Err(ConfigError::validation(
            "Initial reconnect delay must be greater than 0",
        ));
    }

    if let (Some(initial), Some(max)) = (initial, max)
        && max < initial
    {
        return Err(ConfigError::validation(
            "Max reconnect delay must be greater than or equal to initial delay",
        ));
    }

    if multiplier.is_some_and(|m| !m.is_finite() || m < 1.0) {
        return Err(ConfigError::validation(
            "Backoff multiplier must be a finite number of at least 1.0",
        ));
    }

    Ok(())
}

/// Reads a number from TOML, JSON or an environment string.
fn number(value: &Value) -> Option<f64> {
    let num = value.to_num_lossy()?;
    num.to_f64()
        .or_else(|| num.to_i128().map(|n| n as f64))
        .or_else(|| num.to_u128().map(|n| n as f64))
}

fn is_endpoint_key(key: &str) -> bool {
    key.ends_with("_url") || key == "api_base"
}

/// Validates a URL.
fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("url"));
    }

    let valid_schemes = ["ws://", "wss://", "http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {valid_schemes:?}"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::value::{Dict, Tag};
    use std::path::PathBuf;

    fn reconnect_table(entries: &[(&str, Value)]) -> Value {
        let reconnect: Dict = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let mut adapter = Dict::new();
        adapter.insert("reconnect".into(), Value::Dict(Tag::Default, reconnect));
        Value::Dict(Tag::Default, adapter)
    }

    fn adapter_table(entries: &[(&str, &str)]) -> Value {
        let dict: Dict = entries
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(v.to_string())))
            .collect();
        Value::Dict(Tag::Default, dict)
    }

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&RetortConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_rules_path() {
        let config = RetortConfig {
            rules: PathBuf::new(),
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = RetortConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some(PathBuf::from("retort.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_adapter_settings_must_be_a_table() {
        let mut config = RetortConfig::default();
        config
            .adapters
            .insert("discord".into(), Value::from("token".to_string()));
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_adapter_urls_are_checked() {
        let mut config = RetortConfig::default();
        config.adapters.insert(
            "discord".into(),
            adapter_table(&[
                ("token", "abc"),
                ("gateway_url", "wss://gateway.discord.gg"),
                ("api_base", "https://discord.com/api/v10"),
            ]),
        );
        assert!(validate_config(&config).is_ok());

        config.adapters.insert(
            "discord".into(),
            adapter_table(&[("gateway_url", "gateway.discord.gg")]),
        );
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_reconnect_backoff_is_checked() {
        let mut config = RetortConfig::default();
        for bad in [Value::from(-1.0f64), Value::from(0.5f64), Value::from(-1i64), Value::from("-1")] {
            config.adapters.insert(
                "discord".into(),
                reconnect_table(&[("backoff_multiplier", bad)]),
            );
            assert!(matches!(
                validate_config(&config),
                Err(ConfigError::ValidationError { .. })
            ));
        }

        config.adapters.insert(
            "discord".into(),
            reconnect_table(&[("backoff_multiplier", Value::from(1.5f64))]),
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_reconnect_delays_are_checked() {
        let mut config = RetortConfig::default();
        config.adapters.insert(
            "discord".into(),
            reconnect_table(&[
                ("initial_delay_ms", Value::from(5000u64)),
                ("max_delay_ms", Value::from(1000u64)),
            ]),
        );
        assert!(validate_config(&config).is_err());

        config.adapters.insert(
            "discord".into(),
            reconnect_table(&[("initial_delay_ms", Value::from(0u64))]),
        );
        assert!(validate_config(&config).is_err());

        config.adapters.insert(
            "discord".into(),
            reconnect_table(&[
                ("initial_delay_ms", Value::from(500u64)),
                ("max_delay_ms", Value::from(1000u64)),
            ]),
        );
        assert!(validate_config(&config).is_ok());
    }
}
