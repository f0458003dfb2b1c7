//! Configuration file management for syllabus.
//!
//! Provides a TOML-based config file at `~/.config/syllabus/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use syllabus_core::generation::{GeminiConfig, GeminiGenerator, Generator, UnavailableGenerator};
use syllabus_core::{BatchConfig, WorkflowConfig};
use syllabus_store::RegistryConfig;

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

/// Env vars consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["SYLLABUS_API_KEY", "GOOGLE_API_KEY"];
pub const MODEL_ENV_VAR: &str = "SYLLABUS_MODEL";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub generator: GeneratorSection,
    pub workflow: WorkflowSection,
    pub batch: BatchSection,
    pub server: ServerSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_concurrency: Option<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_plans: Option<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_page_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_page_size: Option<usize>,
}

impl ConfigFile {
    /// A file with every setting spelled out at its default value.
    pub fn with_defaults(api_key: Option<String>, model: Option<String>) -> Self {
        let workflow = WorkflowConfig::default();
        Self {
            generator: GeneratorSection {
                api_key,
                model: Some(model.unwrap_or_else(|| GeminiConfig::DEFAULT_MODEL.to_string())),
                temperature: Some(GeminiConfig::DEFAULT_TEMPERATURE),
                endpoint: Some(GeminiConfig::DEFAULT_ENDPOINT.to_string()),
            },
            workflow: WorkflowSection {
                call_timeout_secs: Some(workflow.call_timeout.as_secs()),
                detail_concurrency: Some(workflow.detail_concurrency),
            },
            batch: BatchSection {
                max_concurrent_plans: Some(BatchConfig::DEFAULT_MAX_CONCURRENT_PLANS),
            },
            server: ServerSection {
                bind: Some(DEFAULT_BIND.to_string()),
                port: Some(DEFAULT_PORT),
                default_page_size: Some(RegistryConfig::DEFAULT_PAGE_SIZE),
                max_page_size: Some(RegistryConfig::MAX_PAGE_SIZE),
            },
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the syllabus config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/syllabus` or `~/.config/syllabus`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("syllabus");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("syllabus")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(path)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values supplied on the command line.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct SyllabusConfig {
    /// `None` when no key is configured anywhere.
    pub api_key: Option<String>,
    pub gemini: GeminiSettings,
    pub workflow: WorkflowConfig,
    pub batch: BatchConfig,
    pub registry: RegistryConfig,
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl SyllabusConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// A missing config file is treated as empty; an unparseable one is an
    /// error.
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let file = match load_config() {
            Ok(file) => file,
            Err(e) => {
                if config_path().exists() {
                    return Err(e);
                }
                ConfigFile::default()
            }
        };
        Ok(Self::from_parts(cli, file))
    }

    fn from_parts(cli: &CliOverrides, file: ConfigFile) -> Self {
        let api_key = API_KEY_ENV_VARS
            .iter()
            .find_map(|name| env_var(name))
            .or(file.generator.api_key)
            .filter(|k| !k.trim().is_empty());

        let model = cli
            .model
            .clone()
            .or_else(|| env_var(MODEL_ENV_VAR))
            .or(file.generator.model)
            .unwrap_or_else(|| GeminiConfig::DEFAULT_MODEL.to_string());

        let gemini = GeminiSettings {
            model,
            endpoint: file
                .generator
                .endpoint
                .unwrap_or_else(|| GeminiConfig::DEFAULT_ENDPOINT.to_string()),
            temperature: file
                .generator
                .temperature
                .unwrap_or(GeminiConfig::DEFAULT_TEMPERATURE),
        };

        let workflow_defaults = WorkflowConfig::default();
        let workflow = WorkflowConfig {
            call_timeout: file
                .workflow
                .call_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(workflow_defaults.call_timeout),
            detail_concurrency: file
                .workflow
                .detail_concurrency
                .unwrap_or(workflow_defaults.detail_concurrency)
                .max(1),
        };

        let batch = BatchConfig {
            max_concurrent_plans: file
                .batch
                .max_concurrent_plans
                .unwrap_or(BatchConfig::DEFAULT_MAX_CONCURRENT_PLANS)
                .max(1),
        };

        let registry = RegistryConfig::new(
            file.server
                .default_page_size
                .unwrap_or(RegistryConfig::DEFAULT_PAGE_SIZE),
            file.server
                .max_page_size
                .unwrap_or(RegistryConfig::MAX_PAGE_SIZE),
        );

        Self {
            api_key,
            gemini,
            workflow,
            batch,
            registry,
            bind: cli
                .bind
                .clone()
                .or(file.server.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: cli.port.or(file.server.port).unwrap_or(DEFAULT_PORT),
        }
    }

    /// Build the generation provider.
    ///
    /// Without an API key every call fails and every stage falls back.
    pub fn build_generator(&self) -> Result<Arc<dyn Generator>> {
        let Some(api_key) = &self.api_key else {
            tracing::warn!(
                "no API key configured (set SYLLABUS_API_KEY or run `syllabus init --api-key`); \
                 plans will use fallback content"
            );
            return Ok(Arc::new(UnavailableGenerator::new("no API key configured")));
        };

        let config = GeminiConfig {
            api_key: api_key.clone(),
            model: self.gemini.model.clone(),
            endpoint: self.gemini.endpoint.clone(),
            temperature: self.gemini.temperature,
            request_timeout: self.workflow.call_timeout,
        };
        let generator = GeminiGenerator::new(config).context("failed to build Gemini client")?;
        tracing::debug!(model = %self.gemini.model, "using gemini generator");
        Ok(Arc::new(generator))
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
