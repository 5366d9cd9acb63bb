//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `destination.host`.
pub const ENV_DESTINATION_HOST: &str = "PROXY_DESTINATION_HOST";
/// Environment variable overriding `timeouts.response_ms`.
pub const ENV_RESPONSE_TIMEOUT: &str = "PROXY_RESPONSE_TIMEOUT_MS";
/// Environment variable overriding `timeouts.connect_ms`.
pub const ENV_CONNECT_TIMEOUT: &str = "PROXY_CONNECT_TIMEOUT_MS";
/// Environment variable overriding `timeouts.connection_request_ms`.
pub const ENV_CONNECTION_REQUEST_TIMEOUT: &str = "PROXY_CONNECTION_REQUEST_TIMEOUT_MS";
/// Environment variable overriding `listener.bind_address`.
pub const ENV_BIND_ADDRESS: &str = "PROXY_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: `{value}`")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Build the effective configuration and validate it.
///
/// Layers, lowest first: defaults, the TOML file at `path` (if any), the
/// process environment, then `overrides` (command-line flags).
pub fn load_config<F>(path: Option<&Path>, overrides: F) -> Result<ProxyConfig, ConfigError>
where
    F: FnOnce(&mut ProxyConfig),
{
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply overrides looked up through `lookup` (normally the process environment).
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(ENV_DESTINATION_HOST) {
        config.destination.host = host;
    }
    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    }
    if let Some(ms) = parse_millis(&lookup, ENV_RESPONSE_TIMEOUT)? {
        config.timeouts.response_ms = ms;
    }
    if let Some(ms) = parse_millis(&lookup, ENV_CONNECT_TIMEOUT)? {
        config.timeouts.connect_ms = ms;
    }
    if let Some(ms) = parse_millis(&lookup, ENV_CONNECTION_REQUEST_TIMEOUT)? {
        config.timeouts.connection_request_ms = ms;
    }
    Ok(())
}

fn parse_millis<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = ProxyConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                (ENV_DESTINATION_HOST, "http://upstream:9000"),
                (ENV_RESPONSE_TIMEOUT, "2500"),
                (ENV_CONNECT_TIMEOUT, " 750 "),
                (ENV_CONNECTION_REQUEST_TIMEOUT, "100"),
            ]),
        )
        .unwrap();

        assert_eq!(config.destination.host, "http://upstream:9000");
        assert_eq!(config.timeouts.response_ms, 2500);
        assert_eq!(config.timeouts.connect_ms, 750);
        assert_eq!(config.timeouts.connection_request_ms, 100);
    }

    #[test]
    fn bad_number_is_an_error() {
        let mut config = ProxyConfig::default();
        let err = apply_env_overrides(&mut config, env(&[(ENV_RESPONSE_TIMEOUT, "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: ENV_RESPONSE_TIMEOUT, .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn validation_message_lists_every_error() {
        let err = ConfigError::Validation(vec![
            ValidationError::MissingDestination,
            ValidationError::Zero("timeouts.connect_ms"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: destination.host is required, timeouts.connect_ms must be greater than zero"
        );
    }

    #[test]
    fn load_layers_file_and_overrides() {
        let path = std::env::temp_dir().join(format!("capture-proxy-{}.toml", std::process::id()));
        fs::write(
            &path,
            "[destination]\nhost = \"http://from-file:9000\"\n[timeouts]\nconnect_ms = 250\n",
        )
        .unwrap();

        let config = load_config(Some(&path), |config| {
            config.listener.bind_address = "127.0.0.1:18081".into();
        })
        .unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.timeouts.connect_ms, 250);
        assert_eq!(config.listener.bind_address, "127.0.0.1:18081");
    }

    #[test]
    fn load_without_file_still_validates() {
        let err = load_config(None, |config| config.destination.host.clear()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
