use ecr_engine::config::ValueSetConfig;
use ecr_engine::{ActionDefinition, EngineConfig, MatchPolicy};
use ecr_fhir::FhirClientConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration, one section per concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub value_set: ValueSetConfig,
    #[serde(default)]
    pub fhir: FhirClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_actions")]
    pub actions: Vec<ActionDefinition>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineSection::default(),
            value_set: ValueSetConfig::default(),
            fhir: FhirClientConfig::default(),
            logging: LoggingConfig::default(),
            actions: default_actions(),
        }
    }
}

fn default_actions() -> Vec<ActionDefinition> {
    EngineConfig::default().actions
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default)]
    pub match_policy: MatchPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// The engine's view of this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            match_policy: self.engine.match_policy,
            value_set: self.value_set.clone(),
            actions: self.actions.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.engine_config().validate()?;
        self.fhir.validate()?;
        if self.logging.level.trim().is_empty() {
            return Err("logging.level must not be empty".into());
        }
        Ok(())
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    pub const DEFAULT_CONFIG_FILE: &str = "ecr.toml";

    /// Loads the file (if present), applies `ECR__SECTION__KEY` overrides and
    /// validates the result.
    pub fn load_config(path: Option<&Path>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(format!("config file not found: {}", p.display()));
                }
                builder = builder.add_source(File::from(p.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., ECR__ENGINE__MATCH_POLICY=any-match
        builder = builder.add_source(
            Environment::with_prefix("ECR")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
