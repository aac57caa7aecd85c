//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::routing::{CompileError, HookRegistry, RoutingTable};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found - {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ConfigError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load a configuration file and compile its routing table.
pub fn load_routing(path: &Path, registry: &HookRegistry) -> Result<(ProxyConfig, RoutingTable), ConfigError> {
    let config = load_config(path)?;
    let table = RoutingTable::compile(&config.vhosts, config.hook_policy, registry)?;
    Ok((config, table))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("vhost-proxy-{}-{}.toml", std::process::id(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/rewrites.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert_eq!(
            err.to_string(),
            "configuration file not found - /nonexistent/rewrites.toml"
        );
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("port = \"eighty\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_listed() {
        let err = parse_config("port = 0\nbind = []").unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation failed: no bind addresses configured, listen port must be non-zero"
        );
    }

    #[test]
    fn test_load_routing_compiles_table() {
        let path = temp_file(
            "ok",
            r#"
            port = 9000

            [[vhosts]]
            pattern = "example\\.com"
            port = 3000

            [[vhosts.rules]]
            pattern = "^/old/(.+)$"
            target = "/new/$1"
            "#,
        );
        let (config, table) = load_routing(&path, &HookRegistry::new()).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(table.len(), 1);
        assert_eq!(table.entries()[0].rules().len(), 1);
    }

    #[test]
    fn test_load_routing_rejects_bad_pattern() {
        let path = temp_file(
            "bad",
            r#"
            [[vhosts]]
            pattern = "example\\.com"
            port = 3000

            [[vhosts.rules]]
            pattern = "^/(oops"
            target = "/"
            "#,
        );
        let err = load_routing(&path, &HookRegistry::new()).unwrap_err();
        fs::remove_file(&path).unwrap();

        assert!(matches!(err, ConfigError::Compile(CompileError::RulePattern { .. })));
    }
}
