use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

use crate::errors::{AppError, AppResult};

/// Prefix shared by every environment variable the service reads
pub const ENV_PREFIX: &str = "GLUESTICK";

/// Variables with this prefix are forwarded to the export target's config
pub const TARGET_ENV_PREFIX: &str = "GLUESTICK_TARGET_";

pub const DEFAULT_DATA_DIR: &str = "/tmp/gluestick/data";
pub const DEFAULT_EXPORT_COMMAND: &str =
    ". /home/envs/{target}/bin/activate && target-{target} --config config.json";
pub const DEFAULT_USAGE_ENDPOINT: &str = "https://api.mixpanel.com/track";

/// Typed service configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub web: WebConfig,
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub webhook: WebhookConfig,
    pub usage: UsageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(AppError::configuration(format!(
                "unsupported target format '{}', expected csv or json",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Name of the export target; `None` disables exporting
    pub target: Option<String>,
    pub format: ExportFormat,
    /// Shell command template, `{target}` is replaced with the target name
    pub command: String,
    /// `GLUESTICK_TARGET_*` variables with the prefix stripped and lowercased
    pub settings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    pub url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct UsageConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub token: String,
}

/// Flat view of the layered sources before it is split into sections
#[derive(Debug, Deserialize)]
struct RawConfig {
    web: WebConfig,
    data_dir: PathBuf,
    target: Option<String>,
    target_format: String,
    export_command: String,
    webhook_url: Option<String>,
    usage_stats: String,
    usage_endpoint: String,
    usage_token: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                max_upload_bytes: default_max_upload_bytes(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            },
            export: ExportConfig {
                target: None,
                format: ExportFormat::Csv,
                command: DEFAULT_EXPORT_COMMAND.to_string(),
                settings: BTreeMap::new(),
            },
            webhook: WebhookConfig::default(),
            usage: UsageConfig {
                enabled: false,
                endpoint: DEFAULT_USAGE_ENDPOINT.to_string(),
                token: String::new(),
            },
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file and the process environment
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_sources(config_file, vars)
    }

    /// Build configuration from an explicit set of environment variables
    pub fn from_env_map<I, K, V>(vars: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_sources(None, vars)
    }

    fn from_sources(config_file: Option<&Path>, vars: HashMap<String, String>) -> AppResult<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("web.host", defaults.web.host.clone())
            .and_then(|b| b.set_default("web.port", i64::from(defaults.web.port)))
            .and_then(|b| b.set_default("data_dir", DEFAULT_DATA_DIR))
            .and_then(|b| b.set_default("target_format", "csv"))
            .and_then(|b| b.set_default("export_command", DEFAULT_EXPORT_COMMAND))
            .and_then(|b| b.set_default("usage_stats", "DISABLE"))
            .and_then(|b| b.set_default("usage_endpoint", DEFAULT_USAGE_ENDPOINT))
            .and_then(|b| b.set_default("usage_token", ""))
            .map_err(|e| AppError::configuration(e.to_string()))?;

        if let Some(path) = config_file {
            let name = path.to_string_lossy();
            builder =
                builder.add_source(config::File::new(&name, config::FileFormat::Toml).required(false));
        }

        let env_source: config::Map<String, String> =
            vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).source(Some(env_source)));

        let raw: RawConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AppError::configuration(e.to_string()))?;

        let webhook_url = match raw.webhook_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Some(Url::parse(url).map_err(|e| {
                AppError::configuration(format!("invalid webhook url '{}': {}", url, e))
            })?),
            _ => None,
        };

        Ok(Self {
            web: raw.web,
            storage: StorageConfig {
                data_dir: raw.data_dir,
            },
            export: ExportConfig {
                target: raw.target.filter(|t| !t.trim().is_empty()),
                format: ExportFormat::parse(&raw.target_format)?,
                command: raw.export_command,
                settings: collect_target_settings(&vars),
            },
            webhook: WebhookConfig { url: webhook_url },
            usage: UsageConfig {
                enabled: raw.usage_stats == "ENABLE",
                endpoint: raw.usage_endpoint,
                token: raw.usage_token,
            },
        })
    }

    /// Log the notices operators should see when optional integrations are on
    pub fn log_notices(&self) {
        if self.usage.enabled {
            info!(
                "Anonymous usage tracking statistics are enabled. \
                 Set GLUESTICK_USAGE_STATS=DISABLE to turn them off"
            );
        }
        if let Some(url) = &self.webhook.url {
            info!("Webhook updates are enabled and will be sent to {}", url);
        }
        match &self.export.target {
            Some(target) => info!(
                "Export target '{}' configured ({} setting(s))",
                target,
                self.export.settings.len()
            ),
            None => info!("No export target configured, imports are a no-op"),
        }
    }
}

fn collect_target_settings(vars: &HashMap<String, String>) -> BTreeMap<String, String> {
    vars.iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(TARGET_ENV_PREFIX)
                .filter(|suffix| !suffix.is_empty())
                .map(|suffix| (suffix.to_lowercase(), value.clone()))
        })
        .collect()
}
