//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, pool sizes > 0)
//! - Check the listener address parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - The destination host is only checked for presence; a host that cannot
//!   form a URI is answered per request with 404

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("destination.host is required")]
    MissingDestination,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("pool.max_connections_per_route ({per_route}) exceeds pool.max_total_connections ({total})")]
    PoolRouteExceedsTotal { per_route: usize, total: usize },

    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),
}

/// Check `config`, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.destination.host.trim().is_empty() {
        errors.push(ValidationError::MissingDestination);
    }

    let positive = [
        ("timeouts.connect_ms", config.timeouts.connect_ms),
        ("timeouts.response_ms", config.timeouts.response_ms),
        ("timeouts.connection_request_ms", config.timeouts.connection_request_ms),
        ("pool.max_total_connections", config.pool.max_total_connections as u64),
        ("pool.max_connections_per_route", config.pool.max_connections_per_route as u64),
        ("limits.max_request_body_bytes", config.limits.max_request_body_bytes as u64),
    ];
    for (name, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }

    if config.pool.max_connections_per_route > config.pool.max_total_connections {
        errors.push(ValidationError::PoolRouteExceedsTotal {
            per_route: config.pool.max_connections_per_route,
            total: config.pool.max_total_connections,
        });
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.destination.host = "http://127.0.0.1:9000".into();
        config
    }

    #[test]
    fn default_with_destination_is_valid() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn missing_destination_is_rejected() {
        let errors = validate_config(&ProxyConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingDestination]);
    }

    #[test]
    fn all_errors_are_reported() {
        let mut config = valid();
        config.timeouts.response_ms = 0;
        config.pool.max_total_connections = 5;
        config.pool.max_connections_per_route = 10;
        config.listener.bind_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Zero("timeouts.response_ms")));
        assert!(errors.contains(&ValidationError::BindAddress("nowhere".into())));
    }

    #[test]
    fn malformed_destination_is_accepted_at_startup() {
        let mut config = valid();
        config.destination.host = "http://bad host".into();
        assert!(validate_config(&config).is_ok());
    }
}
