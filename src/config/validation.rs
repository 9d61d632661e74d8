//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every service resolves to a non-empty, parsable origin list
//! - Detect conflicting prefixes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before the route table is built; the process must not serve
//!   traffic with an invalid table

use std::collections::HashSet;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No services configured at all.
    NoServices,
    /// A service has an empty origin list.
    EmptyOrigins { service: String },
    /// An origin URL failed to parse or is missing host/port.
    InvalidOrigin {
        service: String,
        origin: String,
        reason: String,
    },
    /// A service prefix does not start with '/'.
    BadPrefix { service: String, prefix: String },
    /// Two services declare the same prefix.
    DuplicatePrefix { prefix: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NoServices => write!(f, "no services configured"),
            ValidationError::EmptyOrigins { service } => {
                write!(f, "service '{}' has no origins", service)
            }
            ValidationError::InvalidOrigin {
                service,
                origin,
                reason,
            } => write!(
                f,
                "service '{}' origin '{}' is invalid: {}",
                service, origin, reason
            ),
            ValidationError::BadPrefix { service, prefix } => {
                write!(f, "service '{}' prefix '{}' must start with '/'", service, prefix)
            }
            ValidationError::DuplicatePrefix { prefix } => {
                write!(f, "prefix '{}' is declared more than once", prefix)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate the full configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.services.is_empty() {
        errors.push(ValidationError::NoServices);
    }

    let mut seen_prefixes = HashSet::new();
    for service in &config.services {
        if !service.prefix.starts_with('/') {
            errors.push(ValidationError::BadPrefix {
                service: service.name.clone(),
                prefix: service.prefix.clone(),
            });
        }

        if !seen_prefixes.insert(service.prefix.clone()) {
            errors.push(ValidationError::DuplicatePrefix {
                prefix: service.prefix.clone(),
            });
        }

        if service.origins.is_empty() {
            errors.push(ValidationError::EmptyOrigins {
                service: service.name.clone(),
            });
        }

        for origin in &service.origins {
            if let Some(reason) = check_origin(origin) {
                errors.push(ValidationError::InvalidOrigin {
                    service: service.name.clone(),
                    origin: origin.clone(),
                    reason,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check one origin URL; returns a reason string if it is unusable.
fn check_origin(origin: &str) -> Option<String> {
    let url = match Url::parse(origin) {
        Ok(url) => url,
        Err(e) => return Some(e.to_string()),
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Some(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Some("missing host".to_string());
    }
    if url.port_or_known_default().is_none() {
        return Some("missing port".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServiceConfig;

    fn service(name: &str, prefix: &str, origins: &[&str]) -> ServiceConfig {
        ServiceConfig {
            name: name.to_string(),
            prefix: prefix.to_string(),
            origins: origins.iter().map(|o| o.to_string()).collect(),
        }
    }

    #[test]
    fn accepts_valid_config() {
        let mut config = GatewayConfig::default();
        config.services.push(service(
            "account",
            "/api/account",
            &["http://localhost:4000", "http://localhost:4001"],
        ));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_empty_origin_list() {
        let mut config = GatewayConfig::default();
        config.services.push(service("account", "/api/account", &[]));
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyOrigins {
            service: "account".to_string()
        }));
    }

    #[test]
    fn rejects_unparsable_origin() {
        let mut config = GatewayConfig::default();
        config
            .services
            .push(service("account", "/api/account", &["not a url"]));
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::InvalidOrigin { .. }
        ));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let mut config = GatewayConfig::default();
        config
            .services
            .push(service("account", "/api/account", &["ftp://localhost:4000"]));
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_duplicate_prefix() {
        let mut config = GatewayConfig::default();
        config
            .services
            .push(service("a", "/api/account", &["http://localhost:4000"]));
        config
            .services
            .push(service("b", "/api/account", &["http://localhost:4001"]));
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicatePrefix {
            prefix: "/api/account".to_string()
        }));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.services.push(service("a", "api/account", &[]));
        config
            .services
            .push(service("b", "/api/task", &["nonsense"]));
        let errors = validate_config(&config).unwrap_err();
        // bad prefix + empty origins + invalid origin
        assert!(errors.len() >= 3);
    }

    #[test]
    fn rejects_empty_config() {
        let errors = validate_config(&GatewayConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoServices]);
    }
}
