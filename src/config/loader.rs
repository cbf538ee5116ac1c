//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::SiteConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
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

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
///
/// Relative directories in the file resolve against the file's directory.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config = parse_config(&content)?;

    if let Some(base) = path.parent() {
        if config.pages.dir.is_relative() {
            config.pages.dir = base.join(&config.pages.dir);
        }
        if config.build.out_dir.is_relative() {
            config.build.out_dir = base.join(&config.build.out_dir);
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_resolves_relative_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagetree.toml");
        fs::write(&path, "[pages]\ndir = \"site\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.pages.dir, dir.path().join("site"));
        assert_eq!(config.build.out_dir, dir.path().join("dist"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_config("[server"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_error() {
        let err = parse_config("[server]\nrequest_timeout_secs = 0\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: server.request_timeout_secs: must be > 0"
        );
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/pagetree.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
