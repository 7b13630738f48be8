//! Cross-validation configuration
//!
//! Settings can be built in code with [`CrossValidationConfigBuilder`] or
//! loaded from TOML, YAML or JSON. A file may also carry the list of
//! candidate models as formulas:
//!
//! ```toml
//! [cross_validation]
//! folds = 10
//! seed = 2021
//!
//! [[models]]
//! name = "base"
//! formula = "o2sat ~ temp + salinity + phosphate"
//! ```

use crate::error::{Error, Result};
use crate::ml::model_selection::ModelSpec;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a cross-validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossValidationConfig {
    /// Number of folds (k)
    pub folds: usize,
    /// Seed for the fold assignment
    pub seed: u64,
    /// Evaluate folds on the rayon thread pool
    pub parallel: bool,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        CrossValidationConfig {
            folds: 10,
            seed: 42,
            parallel: false,
        }
    }
}

impl CrossValidationConfig {
    /// Checks settings that do not depend on the dataset
    pub fn validate(&self) -> Result<()> {
        if self.folds < 2 {
            return Err(Error::Config(format!(
                "folds must be at least 2, got {}",
                self.folds
            )));
        }
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        parse_validated(text, ConfigFormat::Toml)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        parse_validated(text, ConfigFormat::Yaml)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        parse_validated(text, ConfigFormat::Json)
    }

    /// Loads a config file, picking the format from the extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (text, format) = read_config_file(path.as_ref())?;
        parse_validated(&text, format)
    }
}

/// Builder for CrossValidationConfig
pub struct CrossValidationConfigBuilder {
    config: CrossValidationConfig,
}

impl CrossValidationConfigBuilder {
    pub fn new() -> Self {
        CrossValidationConfigBuilder {
            config: CrossValidationConfig::default(),
        }
    }

    pub fn folds(mut self, folds: usize) -> Self {
        self.config.folds = folds;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn build(self) -> Result<CrossValidationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for CrossValidationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A named model formula as written in a config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub formula: String,
}

/// Cross-validation settings together with the candidate models
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub cross_validation: CrossValidationConfig,
    pub models: Vec<ModelEntry>,
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        self.cross_validation.validate()?;
        self.model_specs().map(|_| ())
    }

    /// Parses every model formula
    pub fn model_specs(&self) -> Result<Vec<ModelSpec>> {
        self.models
            .iter()
            .map(|entry| ModelSpec::from_formula(&entry.name, &entry.formula))
            .collect()
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        parse_validated(text, ConfigFormat::Toml)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        parse_validated(text, ConfigFormat::Yaml)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        parse_validated(text, ConfigFormat::Json)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (text, format) = read_config_file(path.as_ref())?;
        parse_validated(&text, format)
    }
}

trait Validate {
    fn check(&self) -> Result<()>;
}

impl Validate for CrossValidationConfig {
    fn check(&self) -> Result<()> {
        self.validate()
    }
}

impl Validate for ExperimentConfig {
    fn check(&self) -> Result<()> {
        self.validate()
    }
}

#[derive(Debug, Clone, Copy)]
enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

fn parse_validated<T: DeserializeOwned + Validate>(text: &str, format: ConfigFormat) -> Result<T> {
    let value: T = match format {
        ConfigFormat::Toml => toml::from_str(text)?,
        ConfigFormat::Yaml => serde_yaml::from_str(text)?,
        ConfigFormat::Json => serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?,
    };
    value.check()?;
    Ok(value)
}

fn read_config_file(path: &Path) -> Result<(String, ConfigFormat)> {
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => ConfigFormat::Toml,
        Some("yaml") | Some("yml") => ConfigFormat::Yaml,
        Some("json") => ConfigFormat::Json,
        other => {
            return Err(Error::Config(format!(
                "unsupported config extension {:?} for {}",
                other,
                path.display()
            )))
        }
    };
    let text = std::fs::read_to_string(path)?;
    log::debug!("Loaded {:?} config from {}", format, path.display());
    Ok((text, format))
}
