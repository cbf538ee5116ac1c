//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, concurrency > 0, addresses parse)
//! - Check that per-route overrides name absolute paths
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SiteConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::SiteConfig;

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("invalid socket address {:?}", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }
    if config.build.write_concurrency == 0 {
        errors.push(ValidationError::new("build.write_concurrency", "must be > 0"));
    }
    let routes_dir = config.build.routes_dir.trim_matches('/');
    if routes_dir.is_empty() || routes_dir.contains('/') {
        errors.push(ValidationError::new(
            "build.routes_dir",
            "must be a single non-empty path segment",
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address {:?}", config.observability.metrics_address),
        ));
    }

    let overrides = config
        .pages
        .dynamic
        .iter()
        .map(|path| ("pages.dynamic", path))
        .chain(config.pages.no_ssr.iter().map(|path| ("pages.no_ssr", path)))
        .chain(config.pages.static_paths.keys().map(|path| ("pages.static_paths", path)));
    for (field, path) in overrides {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(field, format!("path must be absolute: {}", path)));
        }
    }
    for path in config.pages.static_paths.keys() {
        if config.pages.dynamic.contains(path) {
            errors.push(ValidationError::new(
                "pages.static_paths",
                format!("dynamic page cannot enumerate static paths: {}", path),
            ));
        }
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

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&SiteConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = SiteConfig::default();
        config.server.bind_address = "nowhere".into();
        config.build.write_concurrency = 0;
        config.pages.dynamic.push("time".into());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["server.bind_address", "build.write_concurrency", "pages.dynamic"]
        );
    }

    #[test]
    fn test_dynamic_with_static_paths() {
        let mut config = SiteConfig::default();
        config.pages.dynamic.push("/blog/[slug]".into());
        config
            .pages
            .static_paths
            .insert("/blog/[slug]".into(), vec![vec!["a".into()]]);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "pages.static_paths");
    }
}
