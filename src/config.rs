use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adapters::llm::ModelConfig;

const CONFIG_FILE_NAMES: &[&str] = &[".ai-code-review.yml", ".ai-code-review.yaml"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub auth_token: Option<String>,
    pub system_prompt: Option<String>,

    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub respect_ignore: bool,

    #[serde(default = "default_base")]
    pub base: String,

    #[serde(default = "default_head")]
    pub head: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            host: default_host(),
            port: default_port(),
            auth_token: None,
            system_prompt: None,
            extensions: default_extensions(),
            max_file_size: default_max_file_size(),
            exclude: Vec::new(),
            respect_ignore: false,
            base: default_base(),
            head: default_head(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

/// Values given on the command line; `None` keeps the configured value.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub system_prompt: Option<String>,
    pub read_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        for name in CONFIG_FILE_NAMES {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(CONFIG_FILE_NAMES[0]);
            if home_config.exists() {
                return Self::from_file(&home_config);
            }
        }

        Ok(Config::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn merge_with_cli(&mut self, cli: CliOverrides) {
        if let Some(model) = cli.model {
            self.model = model;
        }
        if let Some(host) = cli.host {
            self.host = host;
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(prompt) = cli.system_prompt {
            self.system_prompt = Some(prompt);
        }
        if let Some(secs) = cli.read_timeout_secs {
            self.read_timeout_secs = secs;
        }
        if self.auth_token.is_none() {
            self.auth_token = std::env::var("OLLAMA_API_KEY")
                .ok()
                .filter(|t| !t.is_empty());
        }
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            model_name: self.model.clone(),
            base_url: ModelConfig::base_url_for(&self.host, self.port),
            auth_token: self.auth_token.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
        }
    }
}

fn default_model() -> String {
    "devstral".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    11434
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_max_file_size() -> u64 {
    crate::core::explorer::DEFAULT_MAX_FILE_SIZE
}

fn default_base() -> String {
    "main".to_string()
}

fn default_head() -> String {
    "HEAD".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_read_timeout_secs() -> u64 {
    300
}
