use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use voltmesh_datahub::HubConfig;
use voltmesh_federation::{AggregationStrategy, FederationConfig};
use voltmesh_privacy::PrivacyConfig;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ConfigFormat {
    Auto,
    Toml,
    Yaml,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format:?} config: {details}")]
    Parse {
        format: ConfigFormat,
        details: String,
    },
    #[error("configuration invalid: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub federation: FederationConfig,
    pub privacy: PrivacyConfig,
    pub hub: HubConfig,
    pub demo: DemoSection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DemoSection {
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    /// Forces one aggregation strategy on every demo task.
    #[serde(default)]
    pub strategy: Option<AggregationStrategy>,
}

const fn default_rounds() -> u32 {
    5
}

impl Default for DemoSection {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            strategy: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.federation
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        self.privacy
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        self.hub
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        if self.demo.rounds == 0 {
            return Err(ConfigError::Validation(
                "demo rounds must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Seeded configuration used by tests and the shipped sample file.
    pub fn sample() -> Self {
        let mut config = Self {
            federation: FederationConfig::seeded(7),
            ..Self::default()
        };
        config.hub.seed = Some(7);
        config
    }

    /// Point every random source at `seed`.
    pub fn apply_seed(&mut self, seed: u64) {
        self.federation.registry.seed = Some(seed);
        self.hub.seed = Some(seed);
    }
}

pub fn load_config(path: &Path, format: ConfigFormat) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&contents, resolve_format(path, format))?;
    config.validate()?;
    Ok(config)
}

/// `format` must already be resolved; `Auto` is treated as TOML.
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    match format {
        ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|err| ConfigError::Parse {
            format,
            details: err.to_string(),
        }),
        ConfigFormat::Toml | ConfigFormat::Auto => {
            toml::from_str(contents).map_err(|err| ConfigError::Parse {
                format: ConfigFormat::Toml,
                details: err.to_string(),
            })
        }
    }
}

fn resolve_format(path: &Path, format: ConfigFormat) -> ConfigFormat {
    match format {
        ConfigFormat::Auto => match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        },
        _ => format,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_is_valid() {
        Config::sample().validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = parse_config(
            r#"
            [federation.learning]
            learning-rate = 0.05
            default-strategy = "reputation-weighted"

            [demo]
            rounds = 3
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.federation.learning.learning_rate, 0.05);
        assert_eq!(
            config.federation.learning.default_strategy,
            AggregationStrategy::ReputationWeighted
        );
        assert_eq!(config.demo.rounds, 3);
        assert_eq!(config.hub, HubConfig::default());
    }

    #[test]
    fn yaml_is_supported() {
        let config = parse_config(
            "privacy:\n  epsilon: 0.5\nhub:\n  collaboration-threshold: 0.4\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert_eq!(config.privacy.epsilon, 0.5);
        assert_eq!(config.hub.collaboration_threshold, 0.4);
    }

    #[test]
    fn zero_rounds_is_invalid() {
        let mut config = Config::sample();
        config.demo.rounds = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            resolve_format(Path::new("node.yml"), ConfigFormat::Auto),
            ConfigFormat::Yaml
        );
        assert_eq!(
            resolve_format(Path::new("node.toml"), ConfigFormat::Auto),
            ConfigFormat::Toml
        );
        assert_eq!(
            resolve_format(Path::new("node.toml"), ConfigFormat::Yaml),
            ConfigFormat::Yaml
        );
    }
}
