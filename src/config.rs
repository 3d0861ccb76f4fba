//! Configuration for user-recon
//!
//! Supports loading config from:
//! - Environment variables
//! - `user-recon.toml` in the working directory
//! - ~/.config/user-recon/config.toml

use crate::anomaly::AnomalyConfig;
use crate::security::RateLimiter;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const PROJECT_CONFIG_FILE: &str = "user-recon.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub anomaly: AnomalySection,
    #[serde(default)]
    pub models: ModelsSection,
    #[serde(default)]
    pub limits: LimitsSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnomalySection {
    /// Expected outlier share, in (0, 0.5] (default: 0.1)
    pub contamination: Option<f64>,
    /// Trees in the isolation forest (default: 100)
    pub n_trees: Option<usize>,
    /// Per-tree subsample cap (default: 256)
    pub max_samples: Option<usize>,
    /// RNG seed (default: 42)
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelsSection {
    /// Directory holding trained artifacts
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LimitsSection {
    /// Requests allowed per actor per window (default: 10)
    pub rate_limit: Option<usize>,
    /// Window length in seconds (default: 60)
    pub window_secs: Option<u64>,
}

impl ReconConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. Project config (`./user-recon.toml`)
    /// 3. User config (~/.config/user-recon/config.toml)
    pub fn load() -> Result<Self> {
        let project = std::env::current_dir()
            .ok()
            .map(|dir| dir.join(PROJECT_CONFIG_FILE));
        Self::load_layers(
            Self::user_config_path().as_deref(),
            project.as_deref(),
            |key| std::env::var(key).ok(),
        )
    }

    /// Layered load with explicit sources
    pub fn load_layers(
        user_file: Option<&Path>,
        project_file: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = ReconConfig::default();

        for path in [user_file, project_file].into_iter().flatten() {
            if path.exists() {
                config.merge(Self::from_file(path)?);
                tracing::debug!("loaded config from {}", path.display());
            }
        }

        if let Some(dir) = env("USER_RECON_MODEL_DIR") {
            config.models.dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = env("USER_RECON_CONTAMINATION") {
            let value = raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("USER_RECON_CONTAMINATION is not a number: {raw}"))?;
            config.anomaly.contamination = Some(value);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("user-recon").join("config.toml"))
    }

    /// Merge another config into this one (other takes priority)
    fn merge(&mut self, other: ReconConfig) {
        let a = other.anomaly;
        if a.contamination.is_some() {
            self.anomaly.contamination = a.contamination;
        }
        if a.n_trees.is_some() {
            self.anomaly.n_trees = a.n_trees;
        }
        if a.max_samples.is_some() {
            self.anomaly.max_samples = a.max_samples;
        }
        if a.seed.is_some() {
            self.anomaly.seed = a.seed;
        }
        if other.models.dir.is_some() {
            self.models.dir = other.models.dir;
        }
        if other.limits.rate_limit.is_some() {
            self.limits.rate_limit = other.limits.rate_limit;
        }
        if other.limits.window_secs.is_some() {
            self.limits.window_secs = other.limits.window_secs;
        }
    }

    /// Out-of-range values are errors, never clamped
    pub fn validate(&self) -> Result<()> {
        self.anomaly_config()
            .validate()
            .context("Invalid [anomaly] configuration")?;
        if self.limits.rate_limit == Some(0) {
            anyhow::bail!("[limits] rate_limit must be at least 1");
        }
        if self.limits.window_secs == Some(0) {
            anyhow::bail!("[limits] window_secs must be at least 1");
        }
        Ok(())
    }

    pub fn anomaly_config(&self) -> AnomalyConfig {
        let defaults = AnomalyConfig::default();
        AnomalyConfig {
            contamination: self.anomaly.contamination.unwrap_or(defaults.contamination),
            n_trees: self.anomaly.n_trees.unwrap_or(defaults.n_trees),
            max_samples: self.anomaly.max_samples.unwrap_or(defaults.max_samples),
            seed: self.anomaly.seed.unwrap_or(defaults.seed),
        }
    }

    /// Model directory (default: <data dir>/user-recon/models, or ./models)
    pub fn model_dir(&self) -> PathBuf {
        self.models.dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|p| p.join("user-recon").join("models"))
                .unwrap_or_else(|| PathBuf::from("models"))
        })
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(
            self.limits.rate_limit.unwrap_or(10),
            Duration::from_secs(self.limits.window_secs.unwrap_or(60)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config() {
        let config = ReconConfig::default();
        assert_eq!(config.anomaly_config(), AnomalyConfig::default());
        assert!(config.validate().is_ok());
        assert!(config.model_dir().ends_with("models"));
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
[anomaly]
contamination = 0.2
seed = 7

[models]
dir = "/tmp/recon-models"

[limits]
rate_limit = 3
"#;
        let config: ReconConfig = toml::from_str(toml_str).unwrap();
        let anomaly = config.anomaly_config();
        assert_eq!(anomaly.contamination, 0.2);
        assert_eq!(anomaly.seed, 7);
        assert_eq!(anomaly.n_trees, 100);
        assert_eq!(config.model_dir(), PathBuf::from("/tmp/recon-models"));
        assert_eq!(config.limits.rate_limit, Some(3));
    }

    #[test]
    fn test_layer_priority() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("user.toml");
        let project = dir.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(&user, "[anomaly]\ncontamination = 0.3\nseed = 1\n").unwrap();
        std::fs::write(&project, "[anomaly]\ncontamination = 0.25\n").unwrap();

        let config = ReconConfig::load_layers(Some(user.as_path()), Some(project.as_path()), no_env).unwrap();
        assert_eq!(config.anomaly.contamination, Some(0.25));
        assert_eq!(config.anomaly.seed, Some(1));

        let config = ReconConfig::load_layers(Some(user.as_path()), Some(project.as_path()), |key| {
            (key == "USER_RECON_CONTAMINATION").then(|| "0.05".to_string())
        })
        .unwrap();
        assert_eq!(config.anomaly.contamination, Some(0.05));
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let config = ReconConfig::load_layers(Some(missing.as_path()), None, no_env).unwrap();
        assert!(config.anomaly.contamination.is_none());
    }

    #[test]
    fn test_out_of_range_contamination_is_error() {
        let result = ReconConfig::load_layers(None, None, |key| {
            (key == "USER_RECON_CONTAMINATION").then(|| "0.9".to_string())
        });
        assert!(result.is_err());

        let result = ReconConfig::load_layers(None, None, |key| {
            (key == "USER_RECON_CONTAMINATION").then(|| "lots".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(&project, "[anomaly\ncontamination = ").unwrap();
        assert!(ReconConfig::load_layers(None, Some(project.as_path()), no_env).is_err());
    }

    #[test]
    fn test_env_model_dir() {
        let config = ReconConfig::load_layers(None, None, |key| {
            (key == "USER_RECON_MODEL_DIR").then(|| "/srv/models".to_string())
        })
        .unwrap();
        assert_eq!(config.model_dir(), PathBuf::from("/srv/models"));
    }
}
