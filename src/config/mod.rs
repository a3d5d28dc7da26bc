use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod validator;
pub mod watcher;

use crate::cli::Cli;
use crate::forms::{DisplayFormat, DEFAULT_MAX_DEPTH};
use crate::validation::RuleSet;

/// Directory, relative to the config root, holding one rule set per file.
pub const RULESETS_DIR: &str = "config/rulesets";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    #[serde(default)]
    pub forms: FormSettings,
    /// Loaded from `config/rulesets/`; the main file keys are case-folded
    /// by the config loader, which would break camelCase predicates.
    #[serde(skip)]
    pub rulesets: Vec<RuleSet>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Renderer settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormSettings {
    /// strftime format for date-only fields
    #[serde(default = "default_date_display")]
    pub date_display_format: String,
    #[serde(default = "default_date_time_display")]
    pub date_time_display_format: String,
    /// Nesting limit while resolving schemas
    #[serde(default = "default_max_schema_depth")]
    pub max_schema_depth: usize,
}

fn default_date_display() -> String {
    DisplayFormat::default().date
}

fn default_date_time_display() -> String {
    DisplayFormat::default().date_time
}

fn default_max_schema_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            date_display_format: default_date_display(),
            date_time_display_format: default_date_time_display(),
            max_schema_depth: default_max_schema_depth(),
        }
    }
}

impl FormSettings {
    pub fn display_format(&self) -> DisplayFormat {
        DisplayFormat {
            date: self.date_display_format.clone(),
            date_time: self.date_time_display_format.clone(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Create settings from CLI arguments (includes config file and CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let config_path = &cli.config;
        let root = config_path
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .unwrap_or(".");

        let s = Config::builder()
            .add_source(File::from(config_path.clone()).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);

        settings.load_external_configs(root)?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
    }

    pub fn from_root(root: &str) -> Result<Self, anyhow::Error> {
        let config_path = Path::new(root).join("agentcloud");
        let s = Config::builder()
            .add_source(File::from(config_path).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;

        settings.load_external_configs(root)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!("Configuration validation failed:\n{}", error_messages.join("\n"))
        })
    }

    fn load_external_configs(&mut self, root: &str) -> Result<(), anyhow::Error> {
        self.load_rulesets_from_dir(&format!("{}/{}", root, RULESETS_DIR))
    }

    pub fn ruleset(&self, name: &str) -> Option<&RuleSet> {
        self.rulesets.iter().find(|r| r.name == name)
    }

    /// Read every JSON, YAML or TOML file in `path` as one rule set, in
    /// file name order.
    fn load_rulesets_from_dir(&mut self, path: &str) -> Result<(), anyhow::Error> {
        let pattern = format!("{}/*", path);
        let mut files: Vec<_> = glob::glob(&pattern)?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!("Failed to read glob entry: {}", e);
                    None
                }
            })
            .collect();
        files.sort();

        for path in files {
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !matches!(ext, "json" | "yaml" | "yml" | "toml") {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            let ruleset: RuleSet = match ext {
                "json" => serde_json::from_str(&content)?,
                "toml" => toml::from_str(&content)?,
                _ => serde_yaml::from_str(&content)?,
            };
            tracing::debug!("Loaded rule set '{}' from {}", ruleset.name, path.display());
            self.rulesets.push(ruleset);
        }
        Ok(())
    }
}
