//! Configuration loading from the environment.
//!
//! Each backend service is configured by a `<NAME>_HOST` / `<NAME>_PORT`
//! pair, or by `<NAME>_URLS` (comma-separated base URLs) when a service runs
//! more than one origin. The gateway binds according to `GATEWAY_HOST` /
//! `GATEWAY_PORT`.
//!
//! The actual work happens in [`from_vars`], a pure function over a
//! key/value map, so tests never have to mutate process-wide environment
//! variables.

use std::collections::HashMap;

use crate::config::schema::{GatewayConfig, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Backend services fronted by the gateway, with their default ports.
/// The prefix for each is `/api/<name>`.
const SERVICES: &[(&str, u16)] = &[
    ("account", 4000),
    ("organization", 4000),
    ("feature", 4000),
    ("workspace", 4000),
    ("location-tracker-device", 4000),
    ("location-tracker-tracking", 2002),
    ("location-tracker-notifier", 4003),
];

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// A `*_PORT` variable is not a valid port number.
    InvalidPort { var: String, value: String },
    /// `GATEWAY_TIMEOUT_SECS` is not a positive integer.
    InvalidTimeout { value: String },
    /// `GATEWAY_LB_STRATEGY` names an unknown strategy.
    InvalidStrategy { value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort { var, value } => {
                write!(f, "{} must be a port number, got '{}'", var, value)
            }
            ConfigError::InvalidTimeout { value } => {
                write!(f, "GATEWAY_TIMEOUT_SECS must be a positive integer, got '{}'", value)
            }
            ConfigError::InvalidStrategy { value } => {
                write!(f, "GATEWAY_LB_STRATEGY: {}", value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from the process environment.
pub fn from_env() -> Result<GatewayConfig, ConfigError> {
    from_vars(&std::env::vars().collect())
}

/// Build a validated configuration from a key/value map.
pub fn from_vars(vars: &HashMap<String, String>) -> Result<GatewayConfig, ConfigError> {
    let mut config = GatewayConfig::default();

    let bind_host = vars
        .get("GATEWAY_HOST")
        .cloned()
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let bind_port = parse_port(vars, "GATEWAY_PORT")?.unwrap_or(8080);
    config.listener.bind_address = format!("{}:{}", bind_host, bind_port);

    if let Some(raw) = vars.get("GATEWAY_LB_STRATEGY") {
        config.strategy = raw
            .parse()
            .map_err(|value| ConfigError::InvalidStrategy { value })?;
    }

    if let Some(raw) = vars.get("GATEWAY_TIMEOUT_SECS") {
        config.timeouts.upstream_secs = raw
            .parse()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| ConfigError::InvalidTimeout { value: raw.clone() })?;
    }

    if let Some(level) = vars.get("GATEWAY_LOG_LEVEL") {
        config.observability.log_level = level.clone();
    }

    for (name, default_port) in SERVICES {
        let key = name.to_uppercase().replace('-', "_");

        let origins = match vars.get(&format!("{}_URLS", key)) {
            Some(urls) => urls
                .split(',')
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect(),
            None => {
                let host = vars
                    .get(&format!("{}_HOST", key))
                    .cloned()
                    .unwrap_or_else(|| "localhost".to_string());
                let port =
                    parse_port(vars, &format!("{}_PORT", key))?.unwrap_or(*default_port);
                vec![format!("http://{}:{}", host, port)]
            }
        };

        config.services.push(ServiceConfig {
            name: name.to_string(),
            prefix: format!("/api/{}", name),
            origins,
        });
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_port(vars: &HashMap<String, String>, var: &str) -> Result<Option<u16>, ConfigError> {
    match vars.get(var) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u16>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidPort {
                var: var.to_string(),
                value: raw.clone(),
            }),
    }
}
