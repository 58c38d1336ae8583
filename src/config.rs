//! Optional config file with default option values

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Defaults read from `config.toml`. Command line flags win over these.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Kubeconfig context
    pub context: Option<String>,

    /// Namespace to read pods from
    pub namespace: Option<String>,

    /// Maximum number of concurrently followed streams
    pub max_log_requests: Option<usize>,

    pub prefix: Option<bool>,
    pub ignore_errors: Option<bool>,
    pub timestamps: Option<bool>,

    /// Duration such as "30s" or "2m"
    pub pod_running_timeout: Option<String>,
}

impl Config {
    /// `<config dir>/kubelike/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kubelike").join("config.toml"))
    }

    /// Load `path`, or the default path when none is given.
    ///
    /// A missing default file yields the default config. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parsed `pod_running_timeout`, if set
    pub fn pod_running_timeout(&self) -> Result<Option<Duration>> {
        self.pod_running_timeout
            .as_deref()
            .map(|value| crate::cli::parse_positive_duration("pod_running_timeout", value))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
            context = "prod"
            namespace = "payments"
            max_log_requests = 8
            prefix = true
            ignore_errors = true
            timestamps = false
            pod_running_timeout = "1m 30s"
            "#,
        )
        .unwrap();

        assert_eq!(config.context.as_deref(), Some("prod"));
        assert_eq!(config.namespace.as_deref(), Some("payments"));
        assert_eq!(config.max_log_requests, Some(8));
        assert_eq!(config.prefix, Some(true));
        assert_eq!(config.ignore_errors, Some(true));
        assert_eq!(config.timestamps, Some(false));
        assert_eq!(
            config.pod_running_timeout().unwrap(),
            Some(Duration::from_secs(90))
        );
    }

    #[test]
    fn test_malformed_config() {
        assert!(Config::from_toml("max_log_requests = \"many\"").is_err());
        assert!(Config::from_toml("prefix = \"yes\"").is_err());
        assert!(Config::from_toml("namespace = ").is_err());
    }

    #[test]
    fn test_invalid_timeout() {
        let config = Config {
            pod_running_timeout: Some("soon".into()),
            ..Default::default()
        };
        assert!(config.pod_running_timeout().is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/kubelike.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
